use alloy_primitives::B256;
use serde::{Deserialize, Deserializer, Serialize};

use crate::common::BlockRef;

use super::PayloadId;

/// ## ForkchoiceStateV1
///
/// Note: [ForkchoiceState.safe_block_hash] and [ForkchoiceState.finalized_block_hash] fields are allowed to have
/// 0x0000000000000000000000000000000000000000000000000000000000000000 value unless transition block is finalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkchoiceState {
    /// 32 byte block hash of the head of the canonical chain
    pub head_block_hash: B256,
    /// 32 byte "safe" block hash of the canonical chain under certain synchrony and honesty assumptions
    /// This value MUST be either equal to or an ancestor of headBlockHash
    pub safe_block_hash: B256,
    /// 32 byte block hash of the most recent finalized block
    pub finalized_block_hash: B256,
}

impl ForkchoiceState {
    pub const fn new(head: B256, safe: B256, finalized: B256) -> Self {
        Self {
            head_block_hash: head,
            safe_block_hash: safe,
            finalized_block_hash: finalized,
        }
    }

    /// Moves the head to `head`, keeping safe and finalized.
    pub fn with_head(self, head: &BlockRef) -> Self {
        Self {
            head_block_hash: head.self_id.hash,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForkchoiceUpdatedStatus {
    Success,
    Syncing,
}

/// The result of a fork choice update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkchoiceUpdatedResult {
    pub status: ForkchoiceUpdatedStatus,
    /// 8 byte identifier of the payload build process, zero when no payload is built
    #[serde(default, deserialize_with = "nullable_payload_id")]
    pub payload_id: PayloadId,
}

impl ForkchoiceUpdatedResult {
    pub const fn is_success(&self) -> bool {
        matches!(self.status, ForkchoiceUpdatedStatus::Success)
    }
}

fn nullable_payload_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PayloadId, D::Error> {
    Ok(Option::<PayloadId>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BlockId;

    #[test]
    fn null_payload_id_is_zero() {
        let result: ForkchoiceUpdatedResult =
            serde_json::from_str(r#"{"status":"SYNCING","payloadId":null}"#).unwrap();
        assert_eq!(result.status, ForkchoiceUpdatedStatus::Syncing);
        assert!(result.payload_id.is_zero());

        let result: ForkchoiceUpdatedResult = serde_json::from_str(r#"{"status":"SUCCESS"}"#).unwrap();
        assert!(result.is_success());
        assert!(result.payload_id.is_zero());
    }

    #[test]
    fn forkchoice_state_json() {
        let state = ForkchoiceState::new(B256::repeat_byte(1), B256::ZERO, B256::ZERO);
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["headBlockHash"], format!("{}", B256::repeat_byte(1)));
        assert!(json.get("safeBlockHash").is_some());
        assert!(json.get("finalizedBlockHash").is_some());
    }

    #[test]
    fn with_head_keeps_safe_and_finalized() {
        let state = ForkchoiceState::new(B256::ZERO, B256::repeat_byte(2), B256::repeat_byte(3));
        let head = BlockRef {
            self_id: BlockId::new(B256::repeat_byte(9), 4),
            parent: BlockId::default(),
        };
        let moved = state.with_head(&head);
        assert_eq!(moved.head_block_hash, B256::repeat_byte(9));
        assert_eq!(moved.safe_block_hash, B256::repeat_byte(2));
        assert_eq!(moved.finalized_block_hash, B256::repeat_byte(3));
    }
}
