use super::PayloadId;

/// An error returned by the execution engine or while talking to it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The payload is not ready yet or has expired. Callers retry on this.
    #[error("payload {0} is unavailable")]
    UnavailablePayload(PayloadId),
    /// The engine answered with an error code other than the known ones.
    #[error("engine returned error code {code}: {message}")]
    Rpc { code: i64, message: String },
    /// The request never got a response.
    #[error("engine request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response could not be decoded.
    #[error("failed to decode engine response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The response carried neither a result nor an error.
    #[error("empty {0} response")]
    EmptyResponse(&'static str),
    /// The bearer token could not be signed.
    #[error("failed to sign engine auth token: {0}")]
    Auth(#[from] jsonwebtoken::errors::Error),
}

impl EngineError {
    pub const fn is_unavailable_payload(&self) -> bool {
        matches!(self, Self::UnavailablePayload(_))
    }

    /// Whether the failure came from the connection rather than from the engine's answer.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
