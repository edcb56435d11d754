use std::time::Duration;

use again::RetryPolicy;
use alloy_primitives::{Address, B256};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use wiremock::{
    matchers::{body_partial_json, method},
    Mock, MockServer, ResponseTemplate,
};

use opnode::{
    derive::{build_payload_with_retry, BuildError},
    engine::{
        EngineApi, EngineError, ExecutePayloadStatus, ForkchoiceState, ForkchoiceUpdatedStatus,
        JwtSecret, L2EngineApi, PayloadAttributes, PayloadId,
    },
};

const FORKCHOICE_UPDATED: &str = "engine_forkchoiceUpdatedV1";
const GET_PAYLOAD: &str = "engine_getPayloadV1";
const EXECUTE_PAYLOAD: &str = "engine_executePayloadV1";

fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
}

fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message }
    }))
}

/// Answers `times` calls of an engine method with `response`. Mocks mounted
/// earlier are used up first.
async fn respond(server: &MockServer, rpc_method: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(response)
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// The JSON-RPC bodies the server received, in order.
async fn received_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.body_json::<Value>().unwrap())
        .collect()
}

fn payload_json(hash: u8) -> Value {
    json!({
        "parentHash": B256::repeat_byte(1),
        "feeRecipient": Address::repeat_byte(3),
        "stateRoot": B256::ZERO,
        "receiptsRoot": B256::ZERO,
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "random": B256::repeat_byte(2),
        "blockNumber": "0x1",
        "gasLimit": "0x1c9c380",
        "gasUsed": "0x0",
        "timestamp": "0x64",
        "extraData": "0x",
        "baseFeePerGas": "0x7",
        "blockHash": B256::repeat_byte(hash),
        "transactions": []
    })
}

fn forkchoice() -> ForkchoiceState {
    let head = B256::repeat_byte(1);
    ForkchoiceState::new(head, head, head)
}

fn attributes() -> PayloadAttributes {
    PayloadAttributes {
        timestamp: 100,
        random: B256::repeat_byte(2),
        suggested_fee_recipient: Address::repeat_byte(3),
    }
}

#[tokio::test]
async fn requests_carry_a_bearer_token() {
    let server = MockServer::start().await;
    respond(
        &server,
        FORKCHOICE_UPDATED,
        rpc_result(json!({ "status": "SUCCESS", "payloadId": "0x0000000000000001" })),
        1,
    )
    .await;
    let api = EngineApi::new(server.uri(), Some(JwtSecret::random()));

    let result = api
        .forkchoice_updated(forkchoice(), Some(attributes()))
        .await
        .unwrap();
    assert_eq!(result.status, ForkchoiceUpdatedStatus::Success);
    assert_eq!(result.payload_id, "0x0000000000000001".parse::<PayloadId>().unwrap());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let authorization = requests[0].headers.get("authorization").unwrap();
    assert!(authorization.to_str().unwrap().starts_with("Bearer "));

    let body = requests[0].body_json::<Value>().unwrap();
    assert_eq!(body["method"], FORKCHOICE_UPDATED);
    assert_eq!(body["params"][1]["timestamp"], "0x64");
}

#[tokio::test]
async fn forkchoice_without_attributes_has_no_payload_id() {
    let server = MockServer::start().await;
    respond(
        &server,
        FORKCHOICE_UPDATED,
        rpc_result(json!({ "status": "SUCCESS", "payloadId": "0x00000000000000ff" })),
        1,
    )
    .await;
    let api = EngineApi::new(server.uri(), None);

    let result = api.forkchoice_updated(forkchoice(), None).await.unwrap();
    assert!(result.is_success());
    assert!(result.payload_id.is_zero());

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies[0]["params"][1], Value::Null);
}

#[tokio::test]
async fn missing_payload_is_reported_as_unavailable() {
    let server = MockServer::start().await;
    respond(&server, GET_PAYLOAD, rpc_error(-32001, "unknown payload"), 1).await;
    let api = EngineApi::new(server.uri(), None);

    let id = PayloadId::new([0, 0, 0, 0, 0, 0, 0, 9]);
    let err = api.get_payload(id).await.unwrap_err();
    assert!(matches!(err, EngineError::UnavailablePayload(got) if got == id));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn other_error_codes_are_kept() {
    let server = MockServer::start().await;
    respond(&server, GET_PAYLOAD, rpc_error(-32602, "invalid params"), 1).await;
    let api = EngineApi::new(server.uri(), None);

    let err = api.get_payload(PayloadId::new([1; 8])).await.unwrap_err();
    assert!(matches!(err, EngineError::Rpc { code: -32602, .. }));
}

#[tokio::test]
async fn execution_result_is_decoded() {
    let server = MockServer::start().await;
    respond(&server, GET_PAYLOAD, rpc_result(payload_json(0xaa)), 1).await;
    respond(
        &server,
        EXECUTE_PAYLOAD,
        rpc_result(json!({
            "status": "INVALID",
            "latestValidHash": B256::repeat_byte(1),
            "validationError": "bad state root"
        })),
        1,
    )
    .await;
    let api = EngineApi::new(server.uri(), None);

    let payload = api.get_payload(PayloadId::new([1; 8])).await.unwrap();
    assert_eq!(payload.block_number, 1);
    assert_eq!(payload.timestamp, 100);

    let result = api.execute_payload(payload).await.unwrap();
    assert_eq!(result.status, ExecutePayloadStatus::Invalid);
    assert_eq!(result.latest_valid_hash, Some(B256::repeat_byte(1)));
    assert_eq!(result.validation_error.as_deref(), Some("bad state root"));
    assert_eq!(received_bodies(&server).await[1]["method"], EXECUTE_PAYLOAD);
}

#[tokio::test]
async fn build_retries_until_payload_is_ready() {
    let server = MockServer::start().await;
    respond(
        &server,
        FORKCHOICE_UPDATED,
        rpc_result(json!({ "status": "SUCCESS", "payloadId": "0x0000000000000002" })),
        1,
    )
    .await;
    respond(&server, GET_PAYLOAD, rpc_error(-32001, "unknown payload"), 2).await;
    respond(&server, GET_PAYLOAD, rpc_result(payload_json(0xbb)), 1).await;
    let api = EngineApi::new(server.uri(), None);
    let policy = RetryPolicy::fixed(Duration::from_millis(5)).with_max_retries(3);

    let payload = build_payload_with_retry(&api, forkchoice(), attributes(), &policy)
        .await
        .unwrap();
    assert_eq!(payload.block_hash, B256::repeat_byte(0xbb));

    let methods: Vec<Value> = received_bodies(&server)
        .await
        .into_iter()
        .map(|body| body["method"].clone())
        .collect();
    assert_eq!(
        methods,
        vec![FORKCHOICE_UPDATED, GET_PAYLOAD, GET_PAYLOAD, GET_PAYLOAD]
    );
}

#[tokio::test]
async fn syncing_engine_cannot_build() {
    let server = MockServer::start().await;
    respond(
        &server,
        FORKCHOICE_UPDATED,
        rpc_result(json!({ "status": "SYNCING", "payloadId": null })),
        1,
    )
    .await;
    let api = EngineApi::new(server.uri(), None);
    let policy = RetryPolicy::fixed(Duration::from_millis(5)).with_max_retries(3);

    let err = build_payload_with_retry(&api, forkchoice(), attributes(), &policy)
        .await
        .unwrap_err();
    assert!(matches!(err, BuildError::Syncing(_)));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_engine_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let api = EngineApi::new(url, None);
    let err = api.get_payload(PayloadId::new([1; 8])).await.unwrap_err();
    assert!(err.is_transport());
}
