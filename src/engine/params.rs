//! Engine Parameters.

use std::time::Duration;

/// The default engine api authentication port.
pub const DEFAULT_AUTH_PORT: u16 = 8551;

/// The ID of the static payload
pub const STATIC_ID: u32 = 1;

/// The json rpc version string
pub const JSONRPC_VERSION: &str = "2.0";

/// The execute payload method string
pub const ENGINE_EXECUTE_PAYLOAD_V1: &str = "engine_executePayloadV1";

/// The execute payload timeout
pub const ENGINE_EXECUTE_PAYLOAD_TIMEOUT: Duration = Duration::from_secs(8);

/// The get payload method string
pub const ENGINE_GET_PAYLOAD_V1: &str = "engine_getPayloadV1";

/// The get payload timeout
pub const ENGINE_GET_PAYLOAD_TIMEOUT: Duration = Duration::from_secs(2);

/// The forkchoice updated method string
pub const ENGINE_FORKCHOICE_UPDATED_V1: &str = "engine_forkchoiceUpdatedV1";

/// The forkchoice updated timeout
pub const ENGINE_FORKCHOICE_UPDATED_TIMEOUT: Duration = Duration::from_secs(8);

/// JSON-RPC error code returned by get-payload when the payload is not ready or has expired
pub const UNAVAILABLE_PAYLOAD_CODE: i64 = -32001;

/// Upper bound on the extra data of a payload
pub const MAX_EXTRA_DATA_BYTES: usize = 32;
