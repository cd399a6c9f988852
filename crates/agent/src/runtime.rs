use std::sync::Arc;

use sfmcp_core::{DispatchError, Dispatcher};
use thiserror::Error;
use tracing::{info, warn};

use crate::directive::{parse_reply, DirectiveError, InvocationDirective, Reply};
use crate::llm::{ChatRequest, LlmClient, LlmError};
use crate::prompt::{capability_description, summary_request};
use crate::sanitize::{parse_arguments, ArgumentError};
use crate::session::Session;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TurnError {
    #[error(transparent)]
    Endpoint(LlmError),
    #[error(transparent)]
    Directive(#[from] DirectiveError),
    #[error(transparent)]
    Arguments(#[from] ArgumentError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("operation `{operation}` reported an error: {message}")]
    OperationReported { operation: String, message: String },
    #[error("summarization failed: {0}")]
    Summary(LlmError),
}

impl TurnError {
    /// Endpoint failures before any directive was seen render differently from
    /// failures inside the tool stage.
    pub fn is_tool_error(&self) -> bool {
        !matches!(self, Self::Endpoint(_))
    }

    pub fn user_message(&self) -> String {
        if self.is_tool_error() {
            format!("Tool error: {self}")
        } else {
            format!("Request failed: {self}")
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    Reply(String),
    Summary { operation: String, text: String },
    Failed(TurnError),
}

impl TurnOutcome {
    pub fn render(&self) -> String {
        match self {
            Self::Reply(text) | Self::Summary { text, .. } => text.clone(),
            Self::Failed(error) => error.user_message(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Runs turns: model call, optional directive dispatch, optional summary.
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    dispatcher: Dispatcher,
    temperature: f32,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, dispatcher: Dispatcher) -> Self {
        Self { llm, dispatcher, temperature: DEFAULT_TEMPERATURE }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The capability description lists only the operations available on the current
    /// connection.
    pub fn start_session(&self) -> Session {
        Session::new(capability_description(&self.dispatcher.available_operations()))
    }

    /// One turn. Never panics on model or tool failures; they come back as
    /// [`TurnOutcome::Failed`] and the session stays usable. Entries appended
    /// before a failure are kept.
    pub async fn handle_turn(&self, session: &mut Session, text: &str) -> TurnOutcome {
        let session_id = session.id;
        info!(event_name = "agent.turn.started", %session_id, "turn started");
        session.transcript.push_user(text);

        let request = ChatRequest {
            messages: session.transcript.entries().to_vec(),
            temperature: Some(self.temperature),
        };
        let reply = match self.llm.complete(request).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    event_name = "agent.turn.endpoint_failed",
                    %session_id,
                    error = %error,
                    "model call failed"
                );
                return TurnOutcome::Failed(TurnError::Endpoint(error));
            }
        };
        session.transcript.push_assistant(reply.clone());

        let directive = match parse_reply(&reply) {
            Ok(Reply::Plain(text)) => {
                info!(event_name = "agent.turn.plain_reply", %session_id, "plain reply");
                return TurnOutcome::Reply(text);
            }
            Ok(Reply::Directive(directive)) => directive,
            Err(error) => return self.fail(session_id, error.into()),
        };
        info!(
            event_name = "agent.turn.directive_parsed",
            %session_id,
            operation = %directive.operation_name,
            "directive parsed"
        );

        let output = match self.invoke(&directive).await {
            Ok(output) => output,
            Err(error) => return self.fail(session_id, error),
        };

        match self.llm.complete(summary_request(text, &output)).await {
            Ok(summary) => {
                session.transcript.push_assistant(summary.clone());
                info!(
                    event_name = "agent.turn.summarized",
                    %session_id,
                    operation = %directive.operation_name,
                    "turn completed with summary"
                );
                TurnOutcome::Summary { operation: directive.operation_name, text: summary }
            }
            Err(error) => self.fail(session_id, TurnError::Summary(error)),
        }
    }

    async fn invoke(&self, directive: &InvocationDirective) -> Result<String, TurnError> {
        let arguments = parse_arguments(&directive.raw_arguments)?;
        let result = self.dispatcher.dispatch(&directive.operation_name, arguments).await?;
        let output = result.text_output();
        if result.is_error {
            return Err(TurnError::OperationReported {
                operation: directive.operation_name.clone(),
                message: output,
            });
        }
        Ok(output)
    }

    fn fail(&self, session_id: uuid::Uuid, error: TurnError) -> TurnOutcome {
        warn!(event_name = "agent.turn.tool_failed", %session_id, error = %error, "turn failed");
        TurnOutcome::Failed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::{TurnError, TurnOutcome};
    use crate::directive::DirectiveError;
    use crate::llm::LlmError;

    #[test]
    fn endpoint_failures_render_as_request_failures() {
        let outcome = TurnOutcome::Failed(TurnError::Endpoint(LlmError::MissingReply(
            "unknown".to_string(),
        )));
        assert_eq!(outcome.render(), "Request failed: model response had no reply: unknown");
        assert!(outcome.is_failure());
    }

    #[test]
    fn tool_stage_failures_render_as_tool_errors() {
        let error = TurnError::Directive(DirectiveError::MissingOperation);
        assert!(error.user_message().starts_with("Tool error: malformed directive"));

        let reported = TurnError::OperationReported {
            operation: "delete_object_fields".to_string(),
            message: "field not found".to_string(),
        };
        assert_eq!(
            reported.user_message(),
            "Tool error: operation `delete_object_fields` reported an error: field not found"
        );
        assert_eq!(TurnOutcome::Reply("hi".to_string()).render(), "hi");
    }
}
