//! Core of the Salesforce tool bridge: configuration, the operation catalog, the
//! liveness filter applied to it, and the dispatcher that routes validated calls to a
//! backend.

pub mod availability;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod operation;
pub mod registry;

pub use dispatch::{Dispatcher, HandlerResult, OperationHandlers};
pub use errors::{DispatchError, OperationError};
pub use operation::{ArgumentMapping, ContentItem, OperationResult};
pub use registry::{Handler, OperationCategory, OperationDescriptor, OperationName, Registry};
