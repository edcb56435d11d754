use std::fmt;

use alloy_consensus::Header;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// A Block Identifier
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub struct BlockId {
    pub hash: B256,
    pub number: u64,
}

impl BlockId {
    pub const fn new(hash: B256, number: u64) -> Self {
        Self { hash, number }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.number)
    }
}

/// A block and its parent.
///
/// `parent.number` is always `self_id.number - 1`, except at height zero where
/// the parent is either floored at zero (L1) or taken from the [Genesis] (L2).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRef {
    #[serde(rename = "self")]
    pub self_id: BlockId,
    pub parent: BlockId,
}

impl BlockRef {
    /// Builds the reference of an L1 header. The parent height is floored at zero.
    pub fn from_header(header: &Header) -> Self {
        Self {
            self_id: BlockId::new(header.hash_slow(), header.number),
            parent: BlockId::new(header.parent_hash, header.number.saturating_sub(1)),
        }
    }

    pub const fn hash(&self) -> B256 {
        self.self_id.hash
    }

    pub const fn number(&self) -> u64 {
        self.self_id.number
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (parent {})", self.self_id, self.parent)
    }
}

/// Binds the L1 and L2 genesis identities of a rollup.
///
/// The L2 genesis block is anchored on `l1`, which therefore doubles as its
/// parent reference.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct Genesis {
    /// The L1 block the rollup starts deriving from
    pub l1: BlockId,
    /// The L2 genesis block
    pub l2: BlockId,
    /// Timestamp of the L2 genesis block
    pub l2_time: u64,
}

impl Genesis {
    /// The parent reference of the L2 genesis block.
    pub const fn l2_parent(&self) -> BlockId {
        self.l1
    }
}
