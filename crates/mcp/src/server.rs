//! MCP server implementation over the operation dispatcher.

use std::sync::Arc;

use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::{RequestContext, RoleServer},
    ErrorData, ServerHandler, ServiceExt,
};
use sfmcp_core::{ArgumentMapping, DispatchError, Dispatcher, OperationResult};
use tracing::{info, warn};

use crate::{McpError, McpResult};

pub const SERVER_NAME: &str = "salesforce-mcp";

const INSTRUCTIONS: &str = "Salesforce administration and data tools. Query and search records, \
     inspect object schemas, create and update records, and create custom objects, fields, \
     metadata types, tabs, apps and report or dashboard folders. Operations that need a live \
     org connection are hidden while the org is disconnected.";

#[derive(Clone)]
pub struct SalesforceMcpServer {
    dispatcher: Dispatcher,
}

impl SalesforceMcpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Tools for the current liveness; evaluated on every call.
    pub fn available_tools(&self) -> Vec<Tool> {
        self.dispatcher
            .available_operations()
            .into_iter()
            .map(|descriptor| {
                let schema = Arc::new(descriptor.input_schema());
                Tool::new(descriptor.name, descriptor.description, schema)
            })
            .collect()
    }

    /// Dispatch a tool call. Handler failures come back as an error tool result so the
    /// host can show them; only unknown names fail the request.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: ArgumentMapping,
    ) -> McpResult<CallToolResult> {
        match self.dispatcher.dispatch(name, arguments).await {
            Ok(result) => Ok(to_call_result(result)),
            Err(error @ DispatchError::UnknownOperation { .. }) => {
                warn!(event_name = "mcp.tool.unknown", tool = %name, "unknown tool requested");
                Err(McpError::from_dispatch(&error))
            }
            Err(error) => Ok(CallToolResult::error(vec![Content::text(error.to_string())])),
        }
    }

    pub async fn run_stdio(self) -> anyhow::Result<()> {
        info!(
            event_name = "mcp.server.starting",
            connected = self.dispatcher.is_connected(),
            "starting MCP server with stdio transport"
        );

        let service = self.serve(rmcp::transport::stdio()).await?;
        let reason = service.waiting().await?;

        info!(event_name = "mcp.server.stopped", reason = ?reason, "MCP server shutdown complete");
        Ok(())
    }
}

fn to_call_result(result: OperationResult) -> CallToolResult {
    let contents = result.items.into_iter().map(|item| Content::text(item.text)).collect();
    if result.is_error {
        CallToolResult::error(contents)
    } else {
        CallToolResult::success(contents)
    }
}

impl ServerHandler for SalesforceMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        };
        info.server_info.name = SERVER_NAME.to_string();
        info.server_info.version = env!("CARGO_PKG_VERSION").to_string();
        info
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(self.available_tools())))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            let arguments = request.arguments.unwrap_or_default();
            self.invoke(&request.name, arguments).await.map_err(ErrorData::from)
        }
    }
}
