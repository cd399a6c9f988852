use thiserror::Error;

use crate::registry::Handler;

/// Failure raised by a backend operation handler after a valid dispatch.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("the Salesforce connection is not active")]
    NotConnected,
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("request to Salesforce failed: {0}")]
    Transport(String),
    #[error("Salesforce returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("handler {0:?} is not supported by this backend")]
    Unsupported(Handler),
}

impl OperationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },
    #[error("operation `{operation}` failed: {source}")]
    Execution {
        operation: String,
        #[source]
        source: OperationError,
    },
}

impl DispatchError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::UnknownOperation { .. } => "unknown_operation",
            Self::Execution { .. } => "operation_execution",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnknownOperation { .. } => {
                "The assistant asked for an operation that does not exist."
            }
            Self::Execution { source: OperationError::NotConnected, .. } => {
                "Salesforce is not connected, so the operation could not run."
            }
            Self::Execution { .. } => "The Salesforce operation failed.",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{DispatchError, OperationError};

    #[test]
    fn unknown_operation_names_the_offender() {
        let error = DispatchError::UnknownOperation { name: "drop_org".to_owned() };
        assert_eq!(error.to_string(), "unknown operation: drop_org");
        assert_eq!(error.error_class(), "unknown_operation");
    }

    #[test]
    fn execution_error_keeps_source_detail() {
        let error = DispatchError::Execution {
            operation: "run_soql_query".to_owned(),
            source: OperationError::Api { status: 400, body: "MALFORMED_QUERY".to_owned() },
        };

        assert!(error.to_string().contains("run_soql_query"));
        assert!(error.to_string().contains("MALFORMED_QUERY"));
        assert_eq!(error.user_message(), "The Salesforce operation failed.");
    }

    #[test]
    fn not_connected_has_specific_user_message() {
        let error = DispatchError::Execution {
            operation: "create_record".to_owned(),
            source: OperationError::NotConnected,
        };
        assert!(error.user_message().contains("not connected"));
    }
}
