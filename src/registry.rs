//! Fixed tool catalog and the typed request each tool call is parsed into.
//!
//! Arguments are validated against the tool's advertised `inputSchema`
//! before they are deserialized, so handlers only ever see well-formed
//! input.

use std::sync::OnceLock;

use jsonschema::Validator;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use crate::protocol::{
    GetFileArgs, ListFilesArgs, RecentContextsArgs, SearchContextsArgs, StoreContextArgs,
    StoreFileArgs, ToolError,
};
use crate::schema;

pub const STORE_CONTEXT: &str = "store_context";
pub const SEARCH_CONTEXTS: &str = "search_contexts";
pub const GET_RECENT_CONTEXTS: &str = "get_recent_contexts";
pub const STORE_FILE: &str = "store_file";
pub const GET_FILE: &str = "get_file";
pub const LIST_FILES: &str = "list_files";

/// One entry of the `tools/list` catalog.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn build_catalog() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: STORE_CONTEXT,
            description: "Store a piece of context so other agents can find it later",
            input_schema: json!({
                "type": "object",
                "required": ["content", "source"],
                "properties": {
                    "content": {
                        "type": "string",
                        "minLength": 1,
                        "description": "The context text to store"
                    },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Tags for categorizing the context"
                    },
                    "source": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Identifier of the agent or tool storing the context"
                    },
                    "metadata": {
                        "type": "object",
                        "description": "Arbitrary additional metadata"
                    }
                }
            }),
        },
        ToolDescriptor {
            name: SEARCH_CONTEXTS,
            description: "Search stored contexts by text, tags, or source",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Text that must appear in the context content"
                    },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Match contexts carrying any of these tags"
                    },
                    "source": {
                        "type": "string",
                        "description": "Only contexts from this source"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default 10)"
                    }
                }
            }),
        },
        ToolDescriptor {
            name: GET_RECENT_CONTEXTS,
            description: "Get the most recently stored contexts",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default 5)"
                    },
                    "source": {
                        "type": "string",
                        "description": "Only contexts from this source"
                    }
                }
            }),
        },
        ToolDescriptor {
            name: STORE_FILE,
            description: "Store a file in shared storage, replacing any file with the same name",
            input_schema: json!({
                "type": "object",
                "required": ["filename", "content", "source"],
                "properties": {
                    "filename": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Name of the file; acts as its unique key"
                    },
                    "content": {
                        "type": "string",
                        "description": "File content"
                    },
                    "contentType": {
                        "type": "string",
                        "description": "MIME type (default text/plain)"
                    },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Tags for categorizing the file"
                    },
                    "source": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Identifier of the agent or tool storing the file"
                    }
                }
            }),
        },
        ToolDescriptor {
            name: GET_FILE,
            description: "Retrieve a file from shared storage",
            input_schema: json!({
                "type": "object",
                "required": ["filename"],
                "properties": {
                    "filename": {
                        "type": "string",
                        "description": "Name of the file to retrieve"
                    }
                }
            }),
        },
        ToolDescriptor {
            name: LIST_FILES,
            description: "List files in shared storage",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "prefix": {
                        "type": "string",
                        "description": "Only files whose name starts with this prefix"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of files (default 20)"
                    }
                }
            }),
        },
    ]
}

/// The six tools this server exposes, in advertised order.
pub fn catalog() -> &'static [ToolDescriptor] {
    static CATALOG: OnceLock<Vec<ToolDescriptor>> = OnceLock::new();
    CATALOG.get_or_init(build_catalog)
}

/// `tools/list` result payload.
pub fn tools_list() -> Value {
    json!({ "tools": catalog() })
}

type CompiledSchemas = Vec<(&'static str, Result<Validator, String>)>;

fn validators() -> &'static CompiledSchemas {
    static VALIDATORS: OnceLock<CompiledSchemas> = OnceLock::new();
    VALIDATORS.get_or_init(|| {
        catalog()
            .iter()
            .map(|tool| {
                let compiled = schema::compile(&tool.input_schema).map_err(|e| e.to_string());
                (tool.name, compiled)
            })
            .collect()
    })
}

/// A tool call whose arguments passed schema validation.
#[derive(Debug, Clone)]
pub enum ToolRequest {
    StoreContext(StoreContextArgs),
    SearchContexts(SearchContextsArgs),
    GetRecentContexts(RecentContextsArgs),
    StoreFile(StoreFileArgs),
    GetFile(GetFileArgs),
    ListFiles(ListFilesArgs),
}

impl ToolRequest {
    /// Look up `name`, validate `arguments` against its schema, and decode them.
    ///
    /// Missing arguments are treated as an empty object.
    pub fn parse(name: &str, arguments: Option<&Value>) -> Result<Self, ToolError> {
        let (tool, compiled) = validators()
            .iter()
            .find(|(tool, _)| *tool == name)
            .ok_or_else(|| ToolError::BadTool(name.to_string()))?;

        let empty = json!({});
        let arguments = match arguments {
            Some(Value::Null) | None => &empty,
            Some(v) => v,
        };

        let validator = compiled.as_ref().map_err(|e| {
            tracing::error!("Schema for {tool} failed to compile: {e}");
            ToolError::StorageFailure(format!("schema for {tool} is unusable"))
        })?;

        schema::check(validator, arguments)
            .map_err(|e| ToolError::BadArgument(format!("Invalid arguments for {tool}: {e}")))?;

        let request = match *tool {
            STORE_CONTEXT => Self::StoreContext(decode(tool, arguments)?),
            SEARCH_CONTEXTS => Self::SearchContexts(decode(tool, arguments)?),
            GET_RECENT_CONTEXTS => Self::GetRecentContexts(decode(tool, arguments)?),
            STORE_FILE => Self::StoreFile(decode(tool, arguments)?),
            GET_FILE => Self::GetFile(decode(tool, arguments)?),
            LIST_FILES => Self::ListFiles(decode(tool, arguments)?),
            other => return Err(ToolError::BadTool(other.to_string())),
        };
        Ok(request)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StoreContext(_) => STORE_CONTEXT,
            Self::SearchContexts(_) => SEARCH_CONTEXTS,
            Self::GetRecentContexts(_) => GET_RECENT_CONTEXTS,
            Self::StoreFile(_) => STORE_FILE,
            Self::GetFile(_) => GET_FILE,
            Self::ListFiles(_) => LIST_FILES,
        }
    }
}

fn decode<T: DeserializeOwned>(tool: &str, arguments: &Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments.clone())
        .map_err(|e| ToolError::BadArgument(format!("Invalid arguments for {tool}: {e}")))
}
