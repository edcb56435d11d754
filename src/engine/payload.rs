use std::{fmt, str::FromStr};

use alloy_consensus::Block;
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bloom, Bytes, B256, B64, U256};
use serde::{Deserialize, Deserializer, Serialize};

use crate::common::BlockId;

use super::MAX_EXTRA_DATA_BYTES;

/// An error converting a block into an [ExecutionPayload].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("extra data is limited to 32 bytes in a payload, got {0}")]
    ExtraDataTooLong(usize),
    #[error("block has no base fee, it predates london")]
    MissingBaseFee,
}

/// Extra data of at most 32 bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BytesMax32(Bytes);

impl BytesMax32 {
    pub const fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Bytes> for BytesMax32 {
    type Error = PayloadError;

    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        if bytes.len() > MAX_EXTRA_DATA_BYTES {
            return Err(PayloadError::ExtraDataTooLong(bytes.len()));
        }
        Ok(Self(bytes))
    }
}

impl<'de> Deserialize<'de> for BytesMax32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Bytes::deserialize(deserializer)?;
        Self::try_from(bytes).map_err(serde::de::Error::custom)
    }
}

/// ## PayloadIdV1
///
/// Identifier of a payload build process. The zero id means no payload is being built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadId(pub B64);

impl PayloadId {
    pub const ZERO: Self = Self(B64::ZERO);

    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(B64::new(bytes))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for PayloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for PayloadId {
    type Err = alloy_primitives::hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B64::from_str(s).map(Self)
    }
}

/// ## ExecutionPayloadV1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayload {
    pub parent_hash: B256,
    pub fee_recipient: Address,
    pub state_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub random: B256,
    #[serde(with = "alloy_serde::quantity")]
    pub block_number: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub gas_limit: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub gas_used: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    pub extra_data: BytesMax32,
    pub base_fee_per_gas: U256,
    pub block_hash: B256,
    /// EIP-2718 encoded transactions, in block order
    pub transactions: Vec<Bytes>,
}

impl ExecutionPayload {
    pub const fn block_id(&self) -> BlockId {
        BlockId::new(self.block_hash, self.block_number)
    }

    pub const fn parent_id(&self) -> BlockId {
        BlockId::new(self.parent_hash, self.block_number.saturating_sub(1))
    }
}

/// ## PayloadAttributesV1
///
/// The parameters the engine builds a new payload from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAttributes {
    /// 64 bit value for the timestamp field of the new payload
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    /// 32 byte value for the random field of the new payload
    pub random: B256,
    /// 20 bytes suggested value for the feeRecipient field of the new payload
    pub suggested_fee_recipient: Address,
}

/// The status of an executed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutePayloadStatus {
    Valid,
    Invalid,
    Syncing,
}

/// The answer of the engine to an execute-payload request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutePayloadResult {
    pub status: ExecutePayloadStatus,
    /// The hash of the most recent valid block in the branch defined by payload and its ancestors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_valid_hash: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

/// Converts a block into the payload the engine would execute to produce it.
///
/// Transactions are encoded one by one in their EIP-2718 form and keep the
/// order of the block.
pub fn block_to_payload<T: Encodable2718>(
    block: &Block<T>,
    random: B256,
) -> Result<ExecutionPayload, PayloadError> {
    let header = &block.header;
    let extra_data = BytesMax32::try_from(header.extra_data.clone())?;
    let base_fee = header
        .base_fee_per_gas
        .ok_or(PayloadError::MissingBaseFee)?;

    let transactions = block
        .body
        .transactions
        .iter()
        .map(|tx| Bytes::from(tx.encoded_2718()))
        .collect();

    Ok(ExecutionPayload {
        parent_hash: header.parent_hash,
        fee_recipient: header.beneficiary,
        state_root: header.state_root,
        receipts_root: header.receipts_root,
        logs_bloom: header.logs_bloom,
        random,
        block_number: header.number,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        timestamp: header.timestamp,
        extra_data,
        base_fee_per_gas: U256::from(base_fee),
        block_hash: header.hash_slow(),
        transactions,
    })
}
