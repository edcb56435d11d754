use async_trait::async_trait;

use super::{
    EngineError, ExecutePayloadResult, ExecutionPayload, ForkchoiceState, ForkchoiceUpdatedResult,
    PayloadAttributes, PayloadId,
};

/// ## L2 Engine API
///
/// The three calls a rollup node makes to drive its execution engine. The
/// engine owns all state; implementors only issue calls.
#[async_trait]
pub trait L2EngineApi: Send + Sync {
    /// ## forkchoice_updated
    ///
    /// Updates which L2 blocks the engine considers to be canonical ([ForkchoiceState] argument),
    /// and optionally initiates block production ([PayloadAttributes] argument) on top of the head.
    ///
    /// ### Engine API
    ///
    /// method: engine_forkchoiceUpdatedV1
    /// params:
    /// - [ForkchoiceState]
    /// - [PayloadAttributes] or null
    /// timeout: 8s
    /// returns:
    /// - [ForkchoiceUpdatedResult], with a zero [PayloadId] when no attributes were given
    async fn forkchoice_updated(
        &self,
        forkchoice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> Result<ForkchoiceUpdatedResult, EngineError>;

    /// ## get_payload
    ///
    /// Retrieves a payload by ID, prepared by [L2EngineApi::forkchoice_updated]
    /// when called with [PayloadAttributes].
    ///
    /// ### Engine API
    ///
    /// method: engine_getPayloadV1
    /// params:
    /// - [PayloadId]: DATA, 8 Bytes - Identifier of the payload build process
    /// timeout: 2s
    /// returns:
    /// - [ExecutionPayload]
    /// potential errors:
    /// - [EngineError::UnavailablePayload] if the payload is not ready or has expired
    async fn get_payload(&self, payload_id: PayloadId) -> Result<ExecutionPayload, EngineError>;

    /// ## execute_payload
    ///
    /// Applies an L2 block to the engine state. An unknown parent is not an
    /// error, the engine answers SYNCING.
    ///
    /// ### Engine API
    ///
    /// method: engine_executePayloadV1
    /// params:
    /// - [ExecutionPayload]
    /// timeout: 8s
    /// returns:
    /// - [ExecutePayloadResult]
    async fn execute_payload(
        &self,
        execution_payload: ExecutionPayload,
    ) -> Result<ExecutePayloadResult, EngineError>;
}
