use alloy_consensus::{Header, ReceiptEnvelope};
use alloy_primitives::{b256, Log, B256};

use crate::{common::BlockId, config::RollupConfig, engine::PayloadAttributes};

/// Topic of the deposit contract's `TransactionDeposited(address,address,uint256,bytes)` event
pub const TRANSACTION_DEPOSITED_TOPIC: B256 =
    b256!("0xb3813568d9991fc951961fcb4c784893574240a28925604d09fc577c55bb7c32");

/// An error deriving attributes from an L1 block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeriveError {
    #[error("L1 block {number} precedes the rollup genesis at L1 block {genesis}")]
    BeforeGenesis { number: u64, genesis: u64 },
    #[error("L1 block {actual} at the genesis height is not the genesis block {expected}")]
    WrongGenesis { expected: BlockId, actual: B256 },
    #[error("L1 timestamp {timestamp} precedes the L2 genesis time {l2_time}")]
    TimestampBeforeGenesis { timestamp: u64, l2_time: u64 },
}

/// Payload attributes derived from one L1 block, with the deposits it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAttributes {
    /// The L1 block the attributes were derived from
    pub l1_origin: BlockId,
    pub attributes: PayloadAttributes,
    /// Deposit events of the block, in receipt and log order
    pub deposits: Vec<Log>,
}

/// Derives the attributes of the L2 block built on top of an L1 block.
///
/// The L2 block takes the timestamp and mix hash of the L1 block. The receipts
/// must already be verified against `l1_header`.
pub fn derive_attributes(
    config: &RollupConfig,
    l1_header: &Header,
    receipts: &[ReceiptEnvelope],
) -> Result<DerivedAttributes, DeriveError> {
    let genesis = &config.genesis;
    let l1_origin = BlockId::new(l1_header.hash_slow(), l1_header.number);

    if l1_origin.number < genesis.l1.number {
        return Err(DeriveError::BeforeGenesis {
            number: l1_origin.number,
            genesis: genesis.l1.number,
        });
    }
    if l1_origin.number == genesis.l1.number && l1_origin.hash != genesis.l1.hash {
        return Err(DeriveError::WrongGenesis {
            expected: genesis.l1,
            actual: l1_origin.hash,
        });
    }
    if l1_header.timestamp < genesis.l2_time {
        return Err(DeriveError::TimestampBeforeGenesis {
            timestamp: l1_header.timestamp,
            l2_time: genesis.l2_time,
        });
    }

    let deposits = deposit_logs(config, receipts);
    tracing::debug!(
        target: "derive",
        l1_origin = %l1_origin,
        deposits = deposits.len(),
        "derived payload attributes"
    );

    Ok(DerivedAttributes {
        l1_origin,
        attributes: PayloadAttributes {
            timestamp: l1_header.timestamp,
            random: l1_header.mix_hash,
            suggested_fee_recipient: config.fee_recipient,
        },
        deposits,
    })
}

/// Collects the deposit events of successful transactions.
fn deposit_logs(config: &RollupConfig, receipts: &[ReceiptEnvelope]) -> Vec<Log> {
    receipts
        .iter()
        .filter(|receipt| receipt.is_success())
        .flat_map(|receipt| receipt.logs())
        .filter(|log| {
            log.address == config.deposit_contract
                && log.topics().first() == Some(&TRANSACTION_DEPOSITED_TOPIC)
        })
        .cloned()
        .collect()
}
