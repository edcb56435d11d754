//! Validated block references on the L1 and L2 chains.
//!
//! L1 references are built from headers, L2 references from full blocks. Both
//! are exposed through [ChainSource] so callers can walk either chain without
//! caring how it is fetched.

use alloy_consensus::{Block, Header, TxEnvelope};
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::B256;
use async_trait::async_trait;

use crate::{
    common::{BlockId, BlockRef, Genesis},
    l1::{ClientError, L1Client},
};

/// A full L2 block with its transactions
pub type L2Block = Block<TxEnvelope>;

/// The subset of L2 node functionality needed to read the L2 block graph.
#[async_trait]
pub trait L2Client: Send + Sync {
    /// Returns the full block at the given height or tag.
    async fn block_by_number(&self, number: BlockNumberOrTag) -> Result<L2Block, ClientError>;

    /// Returns the full block with the given hash.
    async fn block_by_hash(&self, hash: B256) -> Result<L2Block, ClientError>;
}

/// An error produced while building block references.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The L1 header could not be fetched.
    #[error("failed to determine block-hash of L1 height {number}, could not get header: {source}")]
    L1Header {
        number: BlockNumberOrTag,
        source: ClientError,
    },
    /// The L2 block could not be fetched by height.
    #[error("failed to determine block-hash of L2 height {number}, could not get block: {source}")]
    L2BlockByNumber {
        number: BlockNumberOrTag,
        source: ClientError,
    },
    /// The L2 block could not be fetched by hash.
    #[error("failed to get L2 block {hash}: {source}")]
    L2BlockByHash { hash: B256, source: ClientError },
    /// The L2 block at height zero is not the configured genesis block.
    #[error("expected L2 genesis {expected} at height 0, got {actual}")]
    GenesisMismatch { expected: BlockId, actual: B256 },
}

impl SyncError {
    /// Whether the root cause is a missing block, i.e. the end of the chain.
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::L1Header { source, .. }
            | Self::L2BlockByNumber { source, .. }
            | Self::L2BlockByHash { source, .. } => source.is_not_found(),
            Self::GenesisMismatch { .. } => false,
        }
    }
}

/// Derives the reference of an L2 block.
///
/// Height zero is special: the parent is taken from `genesis`, and the block
/// must be the configured genesis block.
pub fn l2_block_ref(header: &Header, genesis: &Genesis) -> Result<BlockRef, SyncError> {
    let hash = header.hash_slow();
    let self_id = BlockId::new(hash, header.number);

    if header.number == 0 {
        if hash != genesis.l2.hash {
            return Err(SyncError::GenesisMismatch {
                expected: genesis.l2,
                actual: hash,
            });
        }
        return Ok(BlockRef {
            self_id,
            parent: genesis.l2_parent(),
        });
    }

    Ok(BlockRef {
        self_id,
        parent: BlockId::new(header.parent_hash, header.number - 1),
    })
}

/// Provides access to the L1 and L2 block graph.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Returns the canonical L1 block at `number` and its parent.
    async fn l1_block_ref_by_number(&self, number: u64) -> Result<BlockRef, SyncError>;

    /// Returns the latest L1 block and its parent.
    async fn l1_head_block_ref(&self) -> Result<BlockRef, SyncError>;

    /// Returns the canonical L2 block at `number` and its parent.
    async fn l2_block_ref_by_number(&self, number: u64) -> Result<BlockRef, SyncError>;

    /// Returns the latest L2 block and its parent.
    async fn l2_head_block_ref(&self) -> Result<BlockRef, SyncError>;

    /// Returns the L2 block with the given hash and its parent. The block is not
    /// necessarily canonical.
    async fn l2_block_ref_by_hash(&self, hash: B256) -> Result<BlockRef, SyncError>;
}

/// The [ChainSource] built on an L1 client, an L2 client and the rollup genesis.
#[derive(Debug, Clone)]
pub struct ChainSyncReference<L1, L2> {
    l1: L1,
    l2: L2,
    genesis: Genesis,
}

impl<L1: L1Client, L2: L2Client> ChainSyncReference<L1, L2> {
    pub const fn new(l1: L1, l2: L2, genesis: Genesis) -> Self {
        Self { l1, l2, genesis }
    }

    pub const fn genesis(&self) -> &Genesis {
        &self.genesis
    }

    async fn l1_block_ref(&self, number: BlockNumberOrTag) -> Result<BlockRef, SyncError> {
        let header = self
            .l1
            .header_by_number(number)
            .await
            .map_err(|source| SyncError::L1Header { number, source })?;
        Ok(BlockRef::from_header(&header))
    }

    async fn l2_block_ref_by_tag(&self, number: BlockNumberOrTag) -> Result<BlockRef, SyncError> {
        let block = self
            .l2
            .block_by_number(number)
            .await
            .map_err(|source| SyncError::L2BlockByNumber { number, source })?;
        l2_block_ref(&block.header, &self.genesis)
    }
}

#[async_trait]
impl<L1: L1Client, L2: L2Client> ChainSource for ChainSyncReference<L1, L2> {
    async fn l1_block_ref_by_number(&self, number: u64) -> Result<BlockRef, SyncError> {
        self.l1_block_ref(number.into()).await
    }

    async fn l1_head_block_ref(&self) -> Result<BlockRef, SyncError> {
        self.l1_block_ref(BlockNumberOrTag::Latest).await
    }

    async fn l2_block_ref_by_number(&self, number: u64) -> Result<BlockRef, SyncError> {
        self.l2_block_ref_by_tag(number.into()).await
    }

    async fn l2_head_block_ref(&self) -> Result<BlockRef, SyncError> {
        self.l2_block_ref_by_tag(BlockNumberOrTag::Latest).await
    }

    async fn l2_block_ref_by_hash(&self, hash: B256) -> Result<BlockRef, SyncError> {
        let block = self
            .l2
            .block_by_hash(hash)
            .await
            .map_err(|source| SyncError::L2BlockByHash { hash, source })?;
        l2_block_ref(&block.header, &self.genesis)
    }
}
