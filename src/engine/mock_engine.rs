use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use alloy_primitives::{keccak256, Bloom, B256, U256};
use async_trait::async_trait;

use crate::common::BlockId;

use super::{
    BytesMax32, EngineError, ExecutePayloadResult, ExecutePayloadStatus, ExecutionPayload,
    ForkchoiceState, ForkchoiceUpdatedResult, ForkchoiceUpdatedStatus, L2EngineApi,
    PayloadAttributes, PayloadId,
};

#[derive(Debug, Default)]
struct EngineState {
    /// Block hash to height of every block the engine has
    blocks: HashMap<B256, u64>,
    forkchoice: Option<ForkchoiceState>,
    payloads: HashMap<PayloadId, ExecutionPayload>,
    next_payload: u64,
}

/// In-memory L2 engine.
///
/// Knows the genesis block and every payload it executed. Payloads built
/// through forkchoice updates are empty blocks with a synthetic hash.
#[derive(Debug, Default)]
pub struct MockEngine {
    state: Mutex<EngineState>,
}

impl MockEngine {
    pub fn new(genesis: BlockId) -> Self {
        let engine = Self::default();
        engine.insert_block(genesis);
        engine
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes a block known without executing it.
    pub fn insert_block(&self, id: BlockId) {
        self.state().blocks.insert(id.hash, id.number);
    }

    pub fn has_block(&self, hash: B256) -> bool {
        self.state().blocks.contains_key(&hash)
    }

    /// The last forkchoice state the engine accepted.
    pub fn forkchoice(&self) -> Option<ForkchoiceState> {
        self.state().forkchoice
    }

    /// Drops a built payload, as if it expired.
    pub fn expire_payload(&self, payload_id: PayloadId) {
        self.state().payloads.remove(&payload_id);
    }

    fn build(parent: BlockId, attributes: &PayloadAttributes) -> ExecutionPayload {
        let mut seed = Vec::with_capacity(32 + 8 + 32 + 20);
        seed.extend_from_slice(parent.hash.as_slice());
        seed.extend_from_slice(&attributes.timestamp.to_be_bytes());
        seed.extend_from_slice(attributes.random.as_slice());
        seed.extend_from_slice(attributes.suggested_fee_recipient.as_slice());

        ExecutionPayload {
            parent_hash: parent.hash,
            fee_recipient: attributes.suggested_fee_recipient,
            state_root: B256::ZERO,
            receipts_root: B256::ZERO,
            logs_bloom: Bloom::ZERO,
            random: attributes.random,
            block_number: parent.number + 1,
            gas_limit: 30_000_000,
            gas_used: 0,
            timestamp: attributes.timestamp,
            extra_data: BytesMax32::default(),
            base_fee_per_gas: U256::from(7),
            block_hash: keccak256(seed),
            transactions: vec![],
        }
    }
}

#[async_trait]
impl L2EngineApi for MockEngine {
    async fn forkchoice_updated(
        &self,
        forkchoice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> Result<ForkchoiceUpdatedResult, EngineError> {
        let mut state = self.state();
        let Some(&head_number) = state.blocks.get(&forkchoice_state.head_block_hash) else {
            return Ok(ForkchoiceUpdatedResult {
                status: ForkchoiceUpdatedStatus::Syncing,
                payload_id: PayloadId::ZERO,
            });
        };
        state.forkchoice = Some(forkchoice_state);

        let payload_id = match payload_attributes {
            Some(attributes) => {
                state.next_payload += 1;
                let id = PayloadId::new(state.next_payload.to_be_bytes());
                let parent = BlockId::new(forkchoice_state.head_block_hash, head_number);
                state.payloads.insert(id, Self::build(parent, &attributes));
                id
            }
            None => PayloadId::ZERO,
        };

        Ok(ForkchoiceUpdatedResult {
            status: ForkchoiceUpdatedStatus::Success,
            payload_id,
        })
    }

    async fn get_payload(&self, payload_id: PayloadId) -> Result<ExecutionPayload, EngineError> {
        self.state()
            .payloads
            .get(&payload_id)
            .cloned()
            .ok_or(EngineError::UnavailablePayload(payload_id))
    }

    async fn execute_payload(
        &self,
        execution_payload: ExecutionPayload,
    ) -> Result<ExecutePayloadResult, EngineError> {
        let mut state = self.state();
        let Some(&parent_number) = state.blocks.get(&execution_payload.parent_hash) else {
            return Ok(ExecutePayloadResult {
                status: ExecutePayloadStatus::Syncing,
                latest_valid_hash: None,
                validation_error: None,
            });
        };

        if execution_payload.block_number != parent_number + 1 {
            return Ok(ExecutePayloadResult {
                status: ExecutePayloadStatus::Invalid,
                latest_valid_hash: Some(execution_payload.parent_hash),
                validation_error: Some(format!(
                    "block number {} does not follow parent {}",
                    execution_payload.block_number, parent_number
                )),
            });
        }

        state
            .blocks
            .insert(execution_payload.block_hash, execution_payload.block_number);
        Ok(ExecutePayloadResult {
            status: ExecutePayloadStatus::Valid,
            latest_valid_hash: Some(execution_payload.block_hash),
            validation_error: None,
        })
    }
}
