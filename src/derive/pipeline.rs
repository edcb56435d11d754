use again::RetryPolicy;
use alloy_primitives::B256;
use tracing::instrument;

use crate::{
    common::{BlockId, BlockRef},
    config::RollupConfig,
    engine::{
        EngineError, ExecutePayloadStatus, ExecutionPayload, ForkchoiceState, L2EngineApi,
    },
    l1::{L1Client, Source, SourceError},
};

use super::stages::{
    build_payload_with_retry, default_retry_policy, derive_attributes, BuildError, DeriveError,
    DerivedAttributes,
};

/// An error anywhere in the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Derive(#[from] DeriveError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// What happened to a payload handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The payload was executed and is the new head.
    Applied(BlockRef),
    /// The engine is missing blocks and is syncing.
    Syncing,
    /// The engine rejected the payload.
    Invalid {
        latest_valid_hash: Option<B256>,
        validation_error: Option<String>,
    },
}

/// Derives L2 payloads from L1 blocks and applies them to the engine.
///
/// Every call is one step. Looping over L1 blocks and reacting to the
/// outcome is left to the caller.
pub struct Pipeline<C, E> {
    source: Source<C>,
    engine: E,
    config: RollupConfig,
    retry: RetryPolicy,
}

impl<C: L1Client, E: L2EngineApi> Pipeline<C, E> {
    pub fn new(source: Source<C>, engine: E, config: RollupConfig) -> Self {
        Self {
            source,
            engine,
            config,
            retry: default_retry_policy(),
        }
    }

    /// Replaces the retry policy used while a payload is unavailable.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub const fn source(&self) -> &Source<C> {
        &self.source
    }

    pub const fn engine(&self) -> &E {
        &self.engine
    }

    pub const fn config(&self) -> &RollupConfig {
        &self.config
    }

    /// Reads an L1 block with verified receipts and derives its attributes.
    #[instrument(level = "debug", target = "derive", skip_all, fields(l1_block = %l1_block))]
    pub async fn derive_attributes(&self, l1_block: BlockId) -> Result<DerivedAttributes, PipelineError> {
        let header = self.source.header_by_hash(l1_block.hash).await?;
        let actual = header.hash_slow();
        if actual != l1_block.hash {
            return Err(SourceError::BlockHashMismatch {
                id: l1_block,
                actual,
            }
            .into());
        }

        let receipts = self
            .source
            .fetch_receipts(l1_block, header.receipts_root)
            .await?;
        Ok(derive_attributes(&self.config, &header, &receipts)?)
    }

    /// Derives the attributes of an L1 block and has the engine build the
    /// payload on top of `forkchoice`'s head.
    #[instrument(
        level = "debug",
        target = "derive",
        skip_all,
        fields(l1_block = %l1_block, head = %forkchoice.head_block_hash)
    )]
    pub async fn derive_payload(
        &self,
        l1_block: BlockId,
        forkchoice: ForkchoiceState,
    ) -> Result<(DerivedAttributes, ExecutionPayload), PipelineError> {
        let derived = self.derive_attributes(l1_block).await?;
        let payload = build_payload_with_retry(
            &self.engine,
            forkchoice,
            derived.attributes.clone(),
            &self.retry,
        )
        .await?;

        tracing::debug!(
            target: "derive",
            block_hash = %payload.block_hash,
            number = payload.block_number,
            "built payload"
        );
        Ok((derived, payload))
    }

    /// Executes a payload and, if valid, makes it the head of `forkchoice`.
    #[instrument(
        level = "debug",
        target = "derive",
        skip_all,
        fields(block_hash = %payload.block_hash, number = payload.block_number)
    )]
    pub async fn apply_payload(
        &self,
        payload: ExecutionPayload,
        forkchoice: ForkchoiceState,
    ) -> Result<ApplyOutcome, PipelineError> {
        let head = BlockRef {
            self_id: payload.block_id(),
            parent: payload.parent_id(),
        };

        let result = self.engine.execute_payload(payload).await?;
        match result.status {
            ExecutePayloadStatus::Valid => {}
            ExecutePayloadStatus::Syncing => return Ok(ApplyOutcome::Syncing),
            ExecutePayloadStatus::Invalid => {
                tracing::warn!(
                    target: "derive",
                    latest_valid_hash = ?result.latest_valid_hash,
                    error = ?result.validation_error,
                    "engine rejected payload"
                );
                return Ok(ApplyOutcome::Invalid {
                    latest_valid_hash: result.latest_valid_hash,
                    validation_error: result.validation_error,
                });
            }
        }

        let update = self
            .engine
            .forkchoice_updated(forkchoice.with_head(&head), None)
            .await?;
        if !update.is_success() {
            return Ok(ApplyOutcome::Syncing);
        }

        tracing::info!(target: "derive", head = %head, "applied payload");
        Ok(ApplyOutcome::Applied(head))
    }
}
