use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::availability;
use crate::errors::{DispatchError, OperationError};
use crate::operation::{ArgumentMapping, OperationResult};
use crate::registry::{Handler, OperationDescriptor, OperationName, Registry};

pub type HandlerResult = Result<OperationResult, OperationError>;

/// Backend collaborator: liveness plus one entry point per [`Handler`].
///
/// Every handler defaults to [`OperationError::Unsupported`] so partial backends and
/// test doubles only implement what they serve.
#[async_trait]
pub trait OperationHandlers: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn create_object(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::CreateObject))
    }

    async fn create_object_with_fields(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::CreateObjectWithFields))
    }

    async fn delete_object_fields(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::DeleteObjectFields))
    }

    async fn create_custom_metadata_type(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::CreateCustomMetadataType))
    }

    async fn create_tab(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::CreateTab))
    }

    async fn create_custom_app(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::CreateCustomApp))
    }

    async fn create_report_folder(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::CreateReportFolder))
    }

    async fn create_dashboard_folder(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::CreateDashboardFolder))
    }

    async fn run_soql_query(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::RunSoqlQuery))
    }

    async fn run_sosl_search(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::RunSoslSearch))
    }

    async fn get_object_fields(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::GetObjectFields))
    }

    async fn create_record(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::CreateRecord))
    }

    async fn update_record(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::UpdateRecord))
    }

    async fn delete_record(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::DeleteRecord))
    }

    async fn describe_object(&self, _args: &ArgumentMapping) -> HandlerResult {
        Err(OperationError::Unsupported(Handler::DescribeObject))
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Registry,
    handlers: Arc<dyn OperationHandlers>,
}

impl Dispatcher {
    pub fn new(handlers: Arc<dyn OperationHandlers>) -> Self {
        Self { registry: Registry::catalog(), handlers }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_connected(&self) -> bool {
        self.handlers.is_connected()
    }

    /// Registry filtered by the backend's liveness at the moment of the call.
    pub fn available_operations(&self) -> Vec<OperationDescriptor> {
        availability::filter(self.registry.list(), self.handlers.is_connected())
    }

    pub async fn dispatch(
        &self,
        name: &str,
        args: ArgumentMapping,
    ) -> Result<OperationResult, DispatchError> {
        let operation: OperationName = name.parse().map_err(|error| {
            warn!(
                event_name = "dispatch.unknown_operation",
                operation = %name,
                "unknown operation"
            );
            error
        })?;

        if let Some(descriptor) = self.registry.get(operation.as_str()) {
            let missing = descriptor.missing_arguments(&args);
            if !missing.is_empty() {
                // Advisory only; the handler decides whether the call is usable.
                warn!(
                    event_name = "dispatch.missing_required_arguments",
                    operation = %operation,
                    missing = ?missing,
                    "dispatching with missing required arguments"
                );
            }
        }

        let handler = operation.handler();
        info!(
            event_name = "dispatch.started",
            operation = %operation,
            handler = ?handler,
            argument_count = args.len(),
            "dispatching operation"
        );

        let outcome = self.route(handler, &args).await;
        match outcome {
            Ok(result) => {
                info!(
                    event_name = "dispatch.completed",
                    operation = %operation,
                    items = result.items.len(),
                    is_error = result.is_error,
                    "operation completed"
                );
                Ok(result)
            }
            Err(source) => {
                warn!(
                    event_name = "dispatch.failed",
                    operation = %operation,
                    error = %source,
                    "operation failed"
                );
                Err(DispatchError::Execution { operation: operation.to_string(), source })
            }
        }
    }

    async fn route(&self, handler: Handler, args: &ArgumentMapping) -> HandlerResult {
        let handlers = self.handlers.as_ref();
        match handler {
            Handler::CreateObject => handlers.create_object(args).await,
            Handler::CreateObjectWithFields => handlers.create_object_with_fields(args).await,
            Handler::DeleteObjectFields => handlers.delete_object_fields(args).await,
            Handler::CreateCustomMetadataType => handlers.create_custom_metadata_type(args).await,
            Handler::CreateTab => handlers.create_tab(args).await,
            Handler::CreateCustomApp => handlers.create_custom_app(args).await,
            Handler::CreateReportFolder => handlers.create_report_folder(args).await,
            Handler::CreateDashboardFolder => handlers.create_dashboard_folder(args).await,
            Handler::RunSoqlQuery => handlers.run_soql_query(args).await,
            Handler::RunSoslSearch => handlers.run_sosl_search(args).await,
            Handler::GetObjectFields => handlers.get_object_fields(args).await,
            Handler::CreateRecord => handlers.create_record(args).await,
            Handler::UpdateRecord => handlers.update_record(args).await,
            Handler::DeleteRecord => handlers.delete_record(args).await,
            Handler::DescribeObject => handlers.describe_object(args).await,
        }
    }
}
