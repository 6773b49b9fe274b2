pub mod request;
pub mod response;

pub use request::{
    GetFileArgs, JsonRpcRequest, ListFilesArgs, RecentContextsArgs, RpcId, SearchContextsArgs,
    StoreContextArgs, StoreFileArgs, ToolCallParams,
};
pub use response::{
    ErrorKind, JsonRpcError, JsonRpcResponse, ToolError, ToolResult, ToolResultContent,
};
