use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::instrument;

use super::{
    EngineError, ExecutePayloadResult, ExecutionPayload, ForkchoiceState, ForkchoiceUpdatedResult,
    JwtSecret, L2EngineApi, PayloadAttributes, PayloadId, ENGINE_EXECUTE_PAYLOAD_TIMEOUT,
    ENGINE_EXECUTE_PAYLOAD_V1, ENGINE_FORKCHOICE_UPDATED_TIMEOUT, ENGINE_FORKCHOICE_UPDATED_V1,
    ENGINE_GET_PAYLOAD_TIMEOUT, ENGINE_GET_PAYLOAD_V1, JSONRPC_VERSION, STATIC_ID,
    UNAVAILABLE_PAYLOAD_CODE,
};

/// An external engine api client
#[derive(Debug, Clone)]
pub struct EngineApi {
    /// Base request url
    base_url: String,
    /// HTTP Client
    client: Client,
    /// Signs a bearer token for every request when set
    secret: Option<JwtSecret>,
}

/// A JSON-RPC request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u32,
    method: &'a str,
    params: P,
}

/// A JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A JSON-RPC response carrying either a result or an error
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<R> {
    #[serde(default = "Option::default")]
    result: Option<R>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

impl EngineApi {
    /// Creates a new external api client
    pub fn new(base_url: impl Into<String>, secret: Option<JwtSecret>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
            secret,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request and decodes its result.
    async fn call<P, R>(
        &self,
        method: &'static str,
        params: P,
        timeout: Duration,
    ) -> Result<R, EngineError>
    where
        P: Serialize + Send,
        R: DeserializeOwned + Send,
    {
        let body = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: STATIC_ID,
            method,
            params,
        };
        tracing::trace!(target: "engine", url = %self.base_url, method, "sending request");

        let mut request = self.client.post(&self.base_url).json(&body).timeout(timeout);
        if let Some(secret) = &self.secret {
            let claims = secret.generate_claims(None);
            request = request.bearer_auth(secret.encode(&claims)?);
        }

        let response: serde_json::Value = request.send().await?.json().await?;
        tracing::trace!(target: "engine", method, %response, "received response");
        decode_response(method, response)
    }
}

/// Splits a raw JSON-RPC response into its result or its error.
fn decode_response<R: DeserializeOwned>(
    method: &'static str,
    response: serde_json::Value,
) -> Result<R, EngineError> {
    let response: JsonRpcResponse<R> = serde_json::from_value(response)?;
    match (response.result, response.error) {
        (_, Some(err)) => Err(EngineError::Rpc {
            code: err.code,
            message: err.message,
        }),
        (Some(result), None) => Ok(result),
        (None, None) => Err(EngineError::EmptyResponse(method)),
    }
}

/// Logs a failed call. Error codes the engine answered with are warnings, a
/// broken connection is an error.
fn log_failure(err: &EngineError) {
    match err {
        EngineError::Rpc { code, message } => {
            tracing::warn!(target: "engine", code, %message, "unexpected error code in engine response");
        }
        EngineError::UnavailablePayload(_) => {
            tracing::warn!(target: "engine", "unavailable payload in get-payload request");
        }
        err => {
            tracing::error!(target: "engine", %err, "engine request failed");
        }
    }
}

#[async_trait]
impl L2EngineApi for EngineApi {
    #[instrument(
        level = "debug",
        target = "engine",
        skip_all,
        fields(head = %forkchoice_state.head_block_hash, building = payload_attributes.is_some())
    )]
    async fn forkchoice_updated(
        &self,
        forkchoice_state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> Result<ForkchoiceUpdatedResult, EngineError> {
        let building = payload_attributes.is_some();
        tracing::debug!(target: "engine", "sharing forkchoice-updated signal");
        let mut result: ForkchoiceUpdatedResult = self
            .call(
                ENGINE_FORKCHOICE_UPDATED_V1,
                (forkchoice_state, payload_attributes),
                ENGINE_FORKCHOICE_UPDATED_TIMEOUT,
            )
            .await
            .inspect_err(log_failure)?;

        tracing::debug!(target: "engine", status = ?result.status, "shared forkchoice-updated signal");
        if building {
            tracing::debug!(target: "engine", payload_id = %result.payload_id, "received payload id");
        } else if !result.payload_id.is_zero() {
            tracing::warn!(
                target: "engine",
                payload_id = %result.payload_id,
                "engine returned a payload id without payload attributes"
            );
            result.payload_id = PayloadId::ZERO;
        }
        Ok(result)
    }

    #[instrument(level = "debug", target = "engine", skip_all, fields(payload_id = %payload_id))]
    async fn get_payload(&self, payload_id: PayloadId) -> Result<ExecutionPayload, EngineError> {
        tracing::debug!(target: "engine", "getting payload");
        let payload: ExecutionPayload = self
            .call(ENGINE_GET_PAYLOAD_V1, [payload_id], ENGINE_GET_PAYLOAD_TIMEOUT)
            .await
            .map_err(|err| match err {
                EngineError::Rpc { code, .. } if code == UNAVAILABLE_PAYLOAD_CODE => {
                    EngineError::UnavailablePayload(payload_id)
                }
                err => err,
            })
            .inspect_err(log_failure)?;
        tracing::debug!(target: "engine", "received payload");
        Ok(payload)
    }

    #[instrument(
        level = "debug",
        target = "engine",
        skip_all,
        fields(block_hash = %execution_payload.block_hash, number = execution_payload.block_number)
    )]
    async fn execute_payload(
        &self,
        execution_payload: ExecutionPayload,
    ) -> Result<ExecutePayloadResult, EngineError> {
        tracing::debug!(target: "engine", "sending payload for execution");
        let result: ExecutePayloadResult = self
            .call(
                ENGINE_EXECUTE_PAYLOAD_V1,
                [execution_payload],
                ENGINE_EXECUTE_PAYLOAD_TIMEOUT,
            )
            .await
            .inspect_err(log_failure)?;
        tracing::debug!(
            target: "engine",
            status = ?result.status,
            latest_valid_hash = ?result.latest_valid_hash,
            message = ?result.validation_error,
            "received payload execution result"
        );
        Ok(result)
    }
}
