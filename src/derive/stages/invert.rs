use alloy_consensus::{Block, Header};
use alloy_primitives::{Address, B256};

use crate::engine::{ExecutionPayload, PayloadAttributes};

/// What the L1 chain must have contained for an L2 block to be derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvertedBlock {
    pub l1_timestamp: u64,
    pub l1_mix_hash: B256,
    /// The attributes the L2 block was built from
    pub attributes: PayloadAttributes,
}

impl InvertedBlock {
    /// Whether `l1_header` could have produced the L2 block.
    pub fn is_justified_by(&self, l1_header: &Header) -> bool {
        l1_header.timestamp == self.l1_timestamp && l1_header.mix_hash == self.l1_mix_hash
    }
}

/// Reconstructs the L1 origin data and attributes behind an L2 block.
pub fn invert_block<T>(block: &Block<T>) -> InvertedBlock {
    let header = &block.header;
    inverted(header.timestamp, header.mix_hash, header.beneficiary)
}

/// Same as [invert_block] for a block still in payload form.
pub fn invert_payload(payload: &ExecutionPayload) -> InvertedBlock {
    inverted(payload.timestamp, payload.random, payload.fee_recipient)
}

fn inverted(timestamp: u64, random: B256, fee_recipient: Address) -> InvertedBlock {
    InvertedBlock {
        l1_timestamp: timestamp,
        l1_mix_hash: random,
        attributes: PayloadAttributes {
            timestamp,
            random,
            suggested_fee_recipient: fee_recipient,
        },
    }
}
