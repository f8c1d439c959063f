//! JSON-RPC behavior of `POST /mcp`.

mod common;

use actix_web::{App, test};
use mcp_tools_server::core::server;
use serde_json::{Value, json};

async fn rpc(body: impl Into<actix_web::web::Bytes>) -> Value {
    let app = test::init_service(App::new().app_data(common::state()).configure(server::configure)).await;
    let req = test::TestRequest::post()
        .uri("/mcp")
        .insert_header(("content-type", "application/json"))
        .set_payload(body.into())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    test::read_body_json(resp).await
}

async fn rpc_json(body: Value) -> Value {
    rpc(body.to_string()).await
}

#[actix_rt::test]
async fn echoes_numeric_and_string_ids() {
    let resp = rpc_json(json!({"jsonrpc": "2.0", "id": 42, "method": "ping"})).await;
    assert_eq!(resp["id"], 42);
    assert_eq!(resp["result"], json!({}));

    let resp = rpc_json(json!({"jsonrpc": "2.0", "id": "abc-1", "method": "ping"})).await;
    assert_eq!(resp["id"], "abc-1");
}

#[actix_rt::test]
async fn missing_or_null_id_is_answered_with_null() {
    let resp = rpc_json(json!({"jsonrpc": "2.0", "method": "tools/list"})).await;
    assert!(resp.as_object().unwrap().contains_key("id"));
    assert_eq!(resp["id"], Value::Null);

    let resp = rpc_json(json!({"jsonrpc": "2.0", "id": null, "method": "ping"})).await;
    assert_eq!(resp["id"], Value::Null);
    assert_eq!(resp["result"], json!({}));
}

#[actix_rt::test]
async fn initialize_reports_protocol_and_server_info() {
    let resp = rpc_json(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}})).await;
    let result = &resp["result"];
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    assert_eq!(result["serverInfo"]["name"], "GPT Integration Tools");
    assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));
}

#[actix_rt::test]
async fn tools_list_is_in_registration_order() {
    let resp = rpc_json(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
    let names: Vec<&str> = resp["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["weather", "calculator", "text-analysis", "file-search"]);
    assert_eq!(resp["result"]["tools"][0]["inputSchema"]["required"], json!(["location"]));
}

#[actix_rt::test]
async fn unknown_method_is_method_not_found() {
    let resp = rpc_json(json!({"jsonrpc": "2.0", "id": 7, "method": "tools/foo"})).await;
    assert_eq!(resp["id"], 7);
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["error"]["message"], "Method not found: tools/foo");
    assert!(resp.get("result").is_none());
}

#[actix_rt::test]
async fn malformed_json_is_parse_error() {
    let resp = rpc("{not json").await;
    assert_eq!(resp["error"]["code"], -32700);
    assert_eq!(resp["error"]["message"], "Parse error");
    assert_eq!(resp["id"], Value::Null);
}

#[actix_rt::test]
async fn calculator_call_returns_text_and_structured_content() {
    let resp = rpc_json(json!({
        "jsonrpc": "2.0", "id": 3, "method": "tools/call",
        "params": {"name": "calculator", "arguments": {"expression": "(2+3)*4"}}
    }))
    .await;
    let result = &resp["result"];
    assert_eq!(result["isError"], false);
    assert_eq!(result["content"][0]["type"], "text");
    assert_eq!(result["content"][0]["text"], "(2+3)*4 = 20");
    assert_eq!(result["structuredContent"]["result"], 20);
}

#[actix_rt::test]
async fn unknown_tool_is_method_not_found() {
    let resp = rpc_json(json!({
        "jsonrpc": "2.0", "id": 4, "method": "tools/call",
        "params": {"name": "teleport", "arguments": {}}
    }))
    .await;
    assert_eq!(resp["id"], 4);
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["error"]["message"], "Unknown tool: teleport");
}

#[actix_rt::test]
async fn invalid_expression_is_an_in_band_tool_error() {
    let resp = rpc_json(json!({
        "jsonrpc": "2.0", "id": 5, "method": "tools/call",
        "params": {"name": "calculator", "arguments": {"expression": "2+a"}}
    }))
    .await;
    assert!(resp.get("error").is_none());
    let result = &resp["result"];
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Error: "), "{text}");
}

#[actix_rt::test]
async fn missing_required_argument_is_an_in_band_tool_error() {
    let resp = rpc_json(json!({
        "jsonrpc": "2.0", "id": 6, "method": "tools/call",
        "params": {"name": "weather", "arguments": {}}
    }))
    .await;
    assert_eq!(resp["result"]["isError"], true);
    assert_eq!(
        resp["result"]["content"][0]["text"],
        "Error: Missing required parameter: location"
    );
}

#[actix_rt::test]
async fn wrongly_typed_argument_is_internal_error() {
    let resp = rpc_json(json!({
        "jsonrpc": "2.0", "id": 8, "method": "tools/call",
        "params": {"name": "weather", "arguments": {"location": 12}}
    }))
    .await;
    assert_eq!(resp["id"], 8);
    assert_eq!(resp["error"]["code"], -32603);
}

#[actix_rt::test]
async fn file_search_via_rpc_filters_by_type() {
    let resp = rpc_json(json!({
        "jsonrpc": "2.0", "id": 9, "method": "tools/call",
        "params": {"name": "file-search", "arguments": {"query": "budget", "file_type": "csv"}}
    }))
    .await;
    assert_eq!(resp["result"]["structuredContent"]["files"], json!(["data_budget.csv"]));
}

#[actix_rt::test]
async fn tools_call_with_null_or_omitted_id_echoes_null() {
    let with_null = json!({
        "jsonrpc": "2.0", "id": null, "method": "tools/call",
        "params": {"name": "calculator", "arguments": {"expression": "2+2"}}
    });
    let mut omitted = with_null.clone();
    omitted.as_object_mut().unwrap().remove("id");

    for body in [with_null, omitted] {
        let resp = rpc_json(body).await;
        assert!(resp.as_object().unwrap().contains_key("id"));
        assert_eq!(resp["id"], Value::Null);
        assert_eq!(resp["result"]["structuredContent"]["result"], 4);
        assert_eq!(resp["result"]["isError"], false);
    }
}

#[actix_rt::test]
async fn tools_call_error_with_null_or_omitted_id_echoes_null() {
    let with_null = json!({
        "jsonrpc": "2.0", "id": null, "method": "tools/call",
        "params": {"name": "calculator", "arguments": {"expression": "2+a"}}
    });
    let mut omitted = with_null.clone();
    omitted.as_object_mut().unwrap().remove("id");

    for body in [with_null, omitted] {
        let resp = rpc_json(body).await;
        assert!(resp.as_object().unwrap().contains_key("id"));
        assert_eq!(resp["id"], Value::Null);
        assert_eq!(resp["result"]["isError"], true);
        assert!(resp.get("error").is_none());
    }
}
