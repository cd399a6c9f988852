//! Salesforce MCP (Model Context Protocol) server.
//!
//! Exposes the operation catalog to MCP hosts over stdio. Tool listings are filtered
//! by the org connection's liveness on every request, and tool calls go through the
//! shared [`sfmcp_core::Dispatcher`].
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sfmcp_core::config::AppConfig;
//! use sfmcp_core::Dispatcher;
//! use sfmcp_crm::SalesforceOrg;
//! use sfmcp_mcp::SalesforceMcpServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let org = Arc::new(SalesforceOrg::new(AppConfig::default().salesforce));
//!     SalesforceMcpServer::new(Dispatcher::new(org)).run_stdio().await
//! }
//! ```

mod server;

pub use server::{SalesforceMcpServer, SERVER_NAME};

use rmcp::ErrorData;
use sfmcp_core::DispatchError;
use thiserror::Error;

/// Errors that fail an MCP request outright rather than producing a tool result.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum McpError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::UnknownTool(_) => -32602,
            McpError::Internal(_) => -32603,
        }
    }

    /// Unknown names fail the request; execution errors are reported in-band by the
    /// caller, so they never reach this conversion.
    pub fn from_dispatch(error: &DispatchError) -> Self {
        match error {
            DispatchError::UnknownOperation { name } => McpError::UnknownTool(name.clone()),
            DispatchError::Execution { .. } => McpError::Internal(error.to_string()),
        }
    }
}

impl From<McpError> for ErrorData {
    fn from(error: McpError) -> Self {
        match error {
            McpError::UnknownTool(_) => ErrorData::invalid_params(error.to_string(), None),
            McpError::Internal(_) => ErrorData::internal_error(error.to_string(), None),
        }
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;
