//! Verified, typed access to L1 data.

use alloy_consensus::{proofs::ordered_trie_root_with_encoder, Header, ReceiptEnvelope, TxEnvelope};
use alloy_eips::{eip2718::Encodable2718, BlockNumberOrTag};
use alloy_primitives::B256;

use crate::common::{BlockId, BlockRef};

use super::{ClientError, HeadSubscription, L1Block, L1Client};

/// An error produced while reading the L1 chain.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Could not get the header at a height. Wraps [ClientError::NotFound] when
    /// the height is past the chain head.
    #[error("failed to determine block-hash of height {number}, could not get header: {source}")]
    HeaderByNumber { number: u64, source: ClientError },
    /// A direct accessor failed.
    #[error("{method} failed: {source}")]
    Request {
        method: &'static str,
        source: ClientError,
    },
    /// Could not fetch a block or its receipts.
    #[error("failed to fetch block {id}: {source}")]
    Fetch { id: BlockId, source: ClientError },
    /// The node returned a different block than the one requested.
    #[error("requested block {id}, but received block with hash {actual}")]
    BlockHashMismatch { id: BlockId, actual: B256 },
    /// The receipts do not commit to the expected receipt root.
    #[error("failed to validate receipts of {id}, computed receipt-hash {computed} does not match expected hash {expected}")]
    ReceiptRootMismatch {
        id: BlockId,
        computed: B256,
        expected: B256,
    },
}

impl SourceError {
    /// Whether the root cause is a missing block, e.g. walking past the chain head.
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::HeaderByNumber { source, .. }
            | Self::Request { source, .. }
            | Self::Fetch { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether the returned data failed verification. These are never retried.
    pub const fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::BlockHashMismatch { .. } | Self::ReceiptRootMismatch { .. }
        )
    }
}

/// Computes the ordered trie root committing to a list of receipts.
pub fn receipts_root(receipts: &[ReceiptEnvelope]) -> B256 {
    ordered_trie_root_with_encoder(receipts, |receipt, buf| receipt.encode_2718(buf))
}

/// Reads the L1 chain through an [L1Client] and verifies what it returns.
#[derive(Debug, Clone)]
pub struct Source<C> {
    client: C,
}

impl<C: L1Client> Source<C> {
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Returns the canonical block at `number` and its parent.
    pub async fn block_link_by_number(&self, number: u64) -> Result<BlockRef, SourceError> {
        let header = self
            .client
            .header_by_number(number.into())
            .await
            .map_err(|source| SourceError::HeaderByNumber { number, source })?;
        Ok(BlockRef::from_header(&header))
    }

    pub async fn subscribe_new_heads(&self) -> Result<HeadSubscription, SourceError> {
        self.client
            .subscribe_new_heads()
            .await
            .map_err(|source| SourceError::Request {
                method: "subscribe_new_heads",
                source,
            })
    }

    pub async fn header_by_hash(&self, hash: B256) -> Result<Header, SourceError> {
        self.client
            .header_by_hash(hash)
            .await
            .map_err(|source| SourceError::Request {
                method: "header_by_hash",
                source,
            })
    }

    pub async fn header_by_number(&self, number: BlockNumberOrTag) -> Result<Header, SourceError> {
        self.client
            .header_by_number(number)
            .await
            .map_err(|source| SourceError::Request {
                method: "header_by_number",
                source,
            })
    }

    pub async fn transaction_receipt(&self, tx_hash: B256) -> Result<ReceiptEnvelope, SourceError> {
        self.client
            .transaction_receipt(tx_hash)
            .await
            .map_err(|source| SourceError::Request {
                method: "transaction_receipt",
                source,
            })
    }

    pub async fn block_by_hash(&self, hash: B256) -> Result<L1Block, SourceError> {
        self.client
            .block_by_hash(hash)
            .await
            .map_err(|source| SourceError::Request {
                method: "block_by_hash",
                source,
            })
    }

    pub async fn block_by_number(&self, number: BlockNumberOrTag) -> Result<L1Block, SourceError> {
        self.client
            .block_by_number(number)
            .await
            .map_err(|source| SourceError::Request {
                method: "block_by_number",
                source,
            })
    }

    /// Fetches the block with the exact hash of `id` together with its receipts.
    pub async fn fetch(&self, id: BlockId) -> Result<(L1Block, Vec<ReceiptEnvelope>), SourceError> {
        tracing::debug!(target: "l1", block = %id, "fetching block and receipts");

        let block = self
            .client
            .block_by_hash(id.hash)
            .await
            .map_err(|source| SourceError::Fetch { id, source })?;

        let actual = block.header.hash_slow();
        if actual != id.hash {
            return Err(SourceError::BlockHashMismatch { id, actual });
        }

        let receipts = self
            .client
            .block_receipts(id.hash)
            .await
            .map_err(|source| SourceError::Fetch { id, source })?;

        Ok((block, receipts))
    }

    /// Fetches the receipts of `id` and checks them against `receipts_root`.
    ///
    /// L1 RPC providers are known to omit receipts or return them out of order,
    /// so a mismatch is reported as [SourceError::ReceiptRootMismatch].
    pub async fn fetch_receipts(
        &self,
        id: BlockId,
        expected: B256,
    ) -> Result<Vec<ReceiptEnvelope>, SourceError> {
        let (_, receipts) = self.fetch(id).await?;

        let computed = receipts_root(&receipts);
        if computed != expected {
            tracing::error!(
                target: "l1",
                block = %id,
                %computed,
                %expected,
                "receipts do not match receipt root"
            );
            return Err(SourceError::ReceiptRootMismatch {
                id,
                computed,
                expected,
            });
        }

        Ok(receipts)
    }

    /// Fetches every block of `window` in order and concatenates their
    /// transactions. Fails as a whole if any block cannot be fetched.
    pub async fn fetch_transactions(&self, window: &[BlockId]) -> Result<Vec<TxEnvelope>, SourceError> {
        let mut transactions = Vec::new();
        for &id in window {
            let block = self
                .client
                .block_by_hash(id.hash)
                .await
                .map_err(|source| SourceError::Fetch { id, source })?;
            transactions.extend(block.body.transactions);
        }
        Ok(transactions)
    }
}
