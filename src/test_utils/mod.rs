//! In-memory L1 and L2 clients.
//!
//! Chains are built with deterministic contents so that hashes are stable
//! across test runs.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use alloy_consensus::{
    Block, BlockBody, Header, Receipt, ReceiptEnvelope, ReceiptWithBloom, SignableTransaction,
    TxEnvelope, TxLegacy,
};
use alloy_eips::{eip2718::Encodable2718, BlockNumberOrTag};
use alloy_primitives::{keccak256, Address, Bloom, Bytes, Log, Signature, TxKind, B256, U256};
use alloy_transport::TransportErrorKind;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    l1::{receipts_root, ClientError, HeadSubscription, L1Block, L1Client},
    sync::{L2Block, L2Client},
};

/// Timestamp of the first block of every test chain
pub const TEST_CHAIN_START_TIME: u64 = 1_700_000_000;

/// Seconds between blocks of every test chain
pub const TEST_BLOCK_TIME: u64 = 12;

/// A signed legacy transaction. The nonce makes it unique.
pub fn test_tx(nonce: u64) -> TxEnvelope {
    let tx = TxLegacy {
        chain_id: Some(1),
        nonce,
        gas_price: 1_000_000_000,
        gas_limit: 21_000,
        to: TxKind::Call(Address::repeat_byte(0x42)),
        value: U256::from(nonce),
        input: Bytes::new(),
    };
    tx.into_signed(Signature::new(U256::from(1), U256::from(1), false))
        .into()
}

pub fn test_receipt(success: bool, cumulative_gas_used: u64, logs: Vec<Log>) -> ReceiptEnvelope {
    ReceiptEnvelope::Legacy(ReceiptWithBloom {
        receipt: Receipt {
            status: success.into(),
            cumulative_gas_used,
            logs,
        },
        logs_bloom: Bloom::ZERO,
    })
}

/// A header at `number` on top of `parent_hash`.
pub fn test_header(number: u64, parent_hash: B256) -> Header {
    Header {
        number,
        parent_hash,
        timestamp: TEST_CHAIN_START_TIME + number * TEST_BLOCK_TIME,
        mix_hash: keccak256(number.to_be_bytes()),
        beneficiary: Address::repeat_byte(0xfe),
        gas_limit: 30_000_000,
        base_fee_per_gas: Some(7),
        ..Default::default()
    }
}

/// Builds a linked chain of `len` blocks, each with two transactions and
/// receipts committed to by the header.
pub fn test_chain(len: u64) -> Vec<(Block<TxEnvelope>, Vec<ReceiptEnvelope>)> {
    let mut chain = Vec::new();
    let mut parent_hash = B256::ZERO;
    for number in 0..len {
        let transactions = vec![test_tx(number * 2), test_tx(number * 2 + 1)];
        let receipts = vec![
            test_receipt(true, 21_000, vec![]),
            test_receipt(true, 42_000, vec![]),
        ];

        let mut header = test_header(number, parent_hash);
        header.gas_used = 42_000;
        header.receipts_root = receipts_root(&receipts);

        parent_hash = header.hash_slow();
        chain.push((
            Block {
                header,
                body: BlockBody {
                    transactions,
                    ommers: vec![],
                    withdrawals: None,
                },
            },
            receipts,
        ));
    }
    chain
}

fn transport_error(msg: &str) -> ClientError {
    ClientError::Transport(TransportErrorKind::custom_str(msg))
}

#[derive(Debug, Default)]
struct ChainState {
    blocks: HashMap<B256, Block<TxEnvelope>>,
    canonical: Vec<B256>,
    receipts: HashMap<B256, Vec<ReceiptEnvelope>>,
    tx_receipts: HashMap<B256, ReceiptEnvelope>,
    failing: HashSet<B256>,
    aliases: HashMap<B256, B256>,
    subscribers: Vec<mpsc::Sender<Header>>,
}

impl ChainState {
    fn push(&mut self, block: Block<TxEnvelope>, receipts: Vec<ReceiptEnvelope>) -> B256 {
        let hash = block.header.hash_slow();
        for (tx, receipt) in block.body.transactions.iter().zip(receipts.iter()) {
            self.tx_receipts
                .insert(keccak256(tx.encoded_2718()), receipt.clone());
        }
        let number = block.header.number as usize;
        if self.canonical.len() <= number {
            self.canonical.resize(number + 1, B256::ZERO);
        }
        self.canonical[number] = hash;
        self.blocks.insert(hash, block);
        self.receipts.insert(hash, receipts);
        hash
    }

    fn resolve(&self, number: BlockNumberOrTag) -> Result<B256, ClientError> {
        let hash = match number {
            BlockNumberOrTag::Number(n) => self.canonical.get(n as usize).copied(),
            BlockNumberOrTag::Earliest => self.canonical.first().copied(),
            _ => self.canonical.last().copied(),
        };
        hash.filter(|h| !h.is_zero())
            .ok_or_else(|| ClientError::not_found(format!("block {number}")))
    }

    fn block(&self, hash: B256) -> Result<Block<TxEnvelope>, ClientError> {
        if self.failing.contains(&hash) {
            return Err(transport_error("connection reset"));
        }
        let served = self.aliases.get(&hash).copied().unwrap_or(hash);
        self.blocks
            .get(&served)
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("block {hash}")))
    }
}

/// An in-memory [L1Client].
#[derive(Debug, Default)]
pub struct MockL1Client {
    state: Mutex<ChainState>,
}

impl MockL1Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client serving [test_chain] of length `len`.
    pub fn with_chain(len: u64) -> Self {
        let client = Self::new();
        for (block, receipts) in test_chain(len) {
            client.push_block(block, receipts);
        }
        client
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a block as the canonical block at its height.
    pub fn push_block(&self, block: L1Block, receipts: Vec<ReceiptEnvelope>) -> B256 {
        self.state().push(block, receipts)
    }

    pub fn canonical(&self, number: u64) -> Option<B256> {
        self.state().resolve(number.into()).ok()
    }

    pub fn block(&self, hash: B256) -> Option<L1Block> {
        self.state().blocks.get(&hash).cloned()
    }

    pub fn header(&self, number: u64) -> Option<Header> {
        let hash = self.canonical(number)?;
        self.block(hash).map(|b| b.header)
    }

    pub fn receipts(&self, hash: B256) -> Option<Vec<ReceiptEnvelope>> {
        self.state().receipts.get(&hash).cloned()
    }

    /// Replaces the receipts served for a block.
    pub fn set_receipts(&self, hash: B256, receipts: Vec<ReceiptEnvelope>) {
        self.state().receipts.insert(hash, receipts);
    }

    /// Makes every request for the block fail with a transport error.
    pub fn fail_block(&self, hash: B256) {
        self.state().failing.insert(hash);
    }

    /// Serves the block `served` when `requested` is asked for.
    pub fn alias_block(&self, requested: B256, served: B256) {
        self.state().aliases.insert(requested, served);
    }

    /// Pushes a header to every open subscription.
    pub fn announce(&self, header: Header) {
        let mut state = self.state();
        state.subscribers.retain(|s| !s.is_closed());
        for subscriber in &state.subscribers {
            let _ = subscriber.try_send(header.clone());
        }
    }

    /// The number of subscriptions that have not been released.
    pub fn subscriber_count(&self) -> usize {
        self.state()
            .subscribers
            .iter()
            .filter(|s| !s.is_closed())
            .count()
    }
}

#[async_trait]
impl L1Client for MockL1Client {
    async fn header_by_number(&self, number: BlockNumberOrTag) -> Result<Header, ClientError> {
        let state = self.state();
        let hash = state.resolve(number)?;
        state.block(hash).map(|b| b.header)
    }

    async fn header_by_hash(&self, hash: B256) -> Result<Header, ClientError> {
        self.state().block(hash).map(|b| b.header)
    }

    async fn block_by_number(&self, number: BlockNumberOrTag) -> Result<L1Block, ClientError> {
        let state = self.state();
        let hash = state.resolve(number)?;
        state.block(hash)
    }

    async fn block_by_hash(&self, hash: B256) -> Result<L1Block, ClientError> {
        self.state().block(hash)
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<ReceiptEnvelope, ClientError> {
        self.state()
            .tx_receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("receipt {tx_hash}")))
    }

    async fn block_receipts(&self, block_hash: B256) -> Result<Vec<ReceiptEnvelope>, ClientError> {
        let state = self.state();
        if state.failing.contains(&block_hash) {
            return Err(transport_error("connection reset"));
        }
        state
            .receipts
            .get(&block_hash)
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("receipts of {block_hash}")))
    }

    async fn subscribe_new_heads(&self) -> Result<HeadSubscription, ClientError> {
        let (sender, receiver) = mpsc::channel(16);
        self.state().subscribers.push(sender);
        Ok(HeadSubscription::new(receiver, None))
    }
}

/// An in-memory [L2Client].
#[derive(Debug, Default)]
pub struct MockL2Client {
    state: Mutex<ChainState>,
}

impl MockL2Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client serving [test_chain] of length `len`.
    pub fn with_chain(len: u64) -> Self {
        let client = Self::new();
        for (block, _) in test_chain(len) {
            client.push_block(block);
        }
        client
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_block(&self, block: L2Block) -> B256 {
        self.state().push(block, vec![])
    }

    pub fn canonical(&self, number: u64) -> Option<B256> {
        self.state().resolve(number.into()).ok()
    }

    pub fn block(&self, hash: B256) -> Option<L2Block> {
        self.state().blocks.get(&hash).cloned()
    }
}

#[async_trait]
impl L2Client for MockL2Client {
    async fn block_by_number(&self, number: BlockNumberOrTag) -> Result<L2Block, ClientError> {
        let state = self.state();
        let hash = state.resolve(number)?;
        state.block(hash)
    }

    async fn block_by_hash(&self, hash: B256) -> Result<L2Block, ClientError> {
        self.state().block(hash)
    }
}
