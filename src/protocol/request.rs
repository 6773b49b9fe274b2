use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC 2.0 ID: a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    Str(String),
}

impl RpcId {
    /// Recover an id from a raw envelope that failed to deserialize as a whole.
    pub fn salvage(raw: &Value) -> Option<Self> {
        raw.get("id")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<RpcId>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

pub const DEFAULT_SEARCH_LIMIT: i64 = 10;
pub const DEFAULT_RECENT_LIMIT: i64 = 5;
pub const DEFAULT_LIST_FILES_LIMIT: i64 = 20;
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

fn default_search_limit() -> i64 {
    DEFAULT_SEARCH_LIMIT
}

fn default_recent_limit() -> i64 {
    DEFAULT_RECENT_LIMIT
}

fn default_list_files_limit() -> i64 {
    DEFAULT_LIST_FILES_LIMIT
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

/// Read a limit that JSON Schema calls an integer, which includes `5.0`.
fn deserialize_limit<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(n) = number.as_i64() {
        return Ok(n);
    }
    if number.is_u64() {
        return Ok(i64::MAX);
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        _ => Err(de::Error::custom(format!("limit must be an integer, got {number}"))),
    }
}

/// Arguments for the `store_context` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreContextArgs {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Arguments for the `search_contexts` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchContextsArgs {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub source: Option<String>,
    /// Accepts i64 so a negative value can mean "no limit".
    #[serde(default = "default_search_limit", deserialize_with = "deserialize_limit")]
    pub limit: i64,
}

/// Arguments for the `get_recent_contexts` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentContextsArgs {
    #[serde(default = "default_recent_limit", deserialize_with = "deserialize_limit")]
    pub limit: i64,
    #[serde(default)]
    pub source: Option<String>,
}

/// Arguments for the `store_file` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreFileArgs {
    pub filename: String,
    pub content: String,
    #[serde(rename = "contentType", default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: String,
}

/// Arguments for the `get_file` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct GetFileArgs {
    pub filename: String,
}

/// Arguments for the `list_files` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ListFilesArgs {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_list_files_limit", deserialize_with = "deserialize_limit")]
    pub limit: i64,
}
