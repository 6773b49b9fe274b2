use jsonschema::validator_for;
use serde_json::Value;

use mcp_context_share::protocol::{JsonRpcError, JsonRpcResponse, RpcId, ToolError};

/// JSON-RPC error envelope (v0), frozen.
const ERROR_ENVELOPE_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "JSON-RPC Error Envelope v0",
  "type": "object",
  "required": ["jsonrpc", "id", "error"],
  "additionalProperties": false,
  "properties": {
    "jsonrpc": { "const": "2.0" },
    "id": { "type": ["integer", "string", "null"] },
    "error": {
      "type": "object",
      "required": ["code", "message"],
      "additionalProperties": false,
      "properties": {
        "code": { "type": "integer" },
        "message": { "type": "string", "minLength": 1 },
        "data": {
          "type": "object",
          "required": ["kind"],
          "properties": {
            "kind": {
              "type": "string",
              "enum": ["bad_method", "bad_tool", "bad_argument", "storage_failure", "not_found"]
            }
          }
        }
      }
    }
  }
}"#;

fn assert_valid(response: &JsonRpcResponse) -> Value {
    let schema_json: Value = serde_json::from_str(ERROR_ENVELOPE_SCHEMA).unwrap();
    let validator = validator_for(&schema_json).unwrap();
    let value = serde_json::to_value(response).unwrap();
    assert!(validator.is_valid(&value), "envelope must satisfy v0 schema: {value}");
    value
}

#[test]
fn every_protocol_error_kind_satisfies_schema() {
    let errors = vec![
        ToolError::BadMethod("nope".into()),
        ToolError::BadTool("nope".into()),
        ToolError::BadArgument("Invalid arguments for get_file: missing filename".into()),
        ToolError::StorageFailure("disk full".into()),
    ];

    for err in errors {
        let response = JsonRpcResponse::error(Some(RpcId::Number(1)), err.into());
        assert_valid(&response);
    }
}

#[test]
fn unparseable_envelope_satisfies_schema_with_null_id() {
    let response = JsonRpcResponse::error(None, JsonRpcError::unparseable("Parse error: eof"));
    let value = assert_valid(&response);
    assert!(value["id"].is_null());
}

#[test]
fn golden_unknown_tool_envelope() {
    let response = JsonRpcResponse::error(
        Some(RpcId::Str("req-1".into())),
        ToolError::BadTool("frobnicate".into()).into(),
    );
    let json_str = serde_json::to_string_pretty(&response).unwrap();

    // Golden snapshot (byte-identical, stable)
    let expected = r#"{
  "jsonrpc": "2.0",
  "id": "req-1",
  "error": {
    "code": -32602,
    "message": "Unknown tool: frobnicate",
    "data": {
      "kind": "bad_tool"
    }
  }
}"#;

    assert_eq!(json_str.trim(), expected.trim(), "error envelope snapshot mismatch");
}
