use std::time::Duration;

use again::RetryPolicy;
use alloy_primitives::B256;

use crate::engine::{
    EngineError, ExecutionPayload, ForkchoiceState, ForkchoiceUpdatedStatus, L2EngineApi,
    PayloadAttributes, PayloadId,
};

/// An error building a payload through the engine.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The engine does not have the head block yet.
    #[error("engine is syncing, cannot build on {0}")]
    Syncing(B256),
    #[error("engine did not start building a payload on {0}")]
    MissingPayloadId(B256),
}

impl BuildError {
    pub fn is_unavailable_payload(&self) -> bool {
        matches!(self, Self::Engine(err) if err.is_unavailable_payload())
    }
}

/// The retry policy used for get-payload while the payload is unavailable.
pub fn default_retry_policy() -> RetryPolicy {
    RetryPolicy::exponential(Duration::from_millis(50)).with_max_retries(5)
}

/// Asks the engine to build on the forkchoice head and returns the payload id.
async fn start_building<E: L2EngineApi + ?Sized>(
    engine: &E,
    forkchoice: ForkchoiceState,
    attributes: PayloadAttributes,
) -> Result<PayloadId, BuildError> {
    let head = forkchoice.head_block_hash;
    let result = engine.forkchoice_updated(forkchoice, Some(attributes)).await?;

    match result.status {
        ForkchoiceUpdatedStatus::Syncing => Err(BuildError::Syncing(head)),
        ForkchoiceUpdatedStatus::Success if result.payload_id.is_zero() => {
            Err(BuildError::MissingPayloadId(head))
        }
        ForkchoiceUpdatedStatus::Success => Ok(result.payload_id),
    }
}

/// Builds a payload with one forkchoice update followed by one get-payload.
pub async fn build_payload<E: L2EngineApi + ?Sized>(
    engine: &E,
    forkchoice: ForkchoiceState,
    attributes: PayloadAttributes,
) -> Result<ExecutionPayload, BuildError> {
    let payload_id = start_building(engine, forkchoice, attributes).await?;
    Ok(engine.get_payload(payload_id).await?)
}

/// Like [build_payload], but retries get-payload with `policy` while the
/// engine reports the payload as unavailable. Other errors are returned
/// immediately.
pub async fn build_payload_with_retry<E: L2EngineApi + ?Sized>(
    engine: &E,
    forkchoice: ForkchoiceState,
    attributes: PayloadAttributes,
    policy: &RetryPolicy,
) -> Result<ExecutionPayload, BuildError> {
    let payload_id = start_building(engine, forkchoice, attributes).await?;
    let payload = policy
        .retry_if(
            || engine.get_payload(payload_id),
            EngineError::is_unavailable_payload,
        )
        .await?;
    Ok(payload)
}
