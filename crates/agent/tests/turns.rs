use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use sfmcp_agent::{
    AgentRuntime, ChatRequest, LlmClient, LlmError, Role, TurnError, TurnOutcome,
};
use sfmcp_core::{
    ArgumentMapping, DispatchError, Dispatcher, HandlerResult, OperationHandlers, OperationResult,
};

/// Replays canned replies in order and records every request it receives.
#[derive(Default)]
struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()), requests: Mutex::default() })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        self.requests.lock().expect("lock").push(request);
        self.replies
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::MissingReply("script exhausted".to_string())))
    }
}

#[derive(Default)]
struct FakeOrg {
    calls: Mutex<Vec<(String, ArgumentMapping)>>,
}

#[async_trait]
impl OperationHandlers for FakeOrg {
    fn is_connected(&self) -> bool {
        true
    }

    async fn get_object_fields(&self, args: &ArgumentMapping) -> HandlerResult {
        self.calls.lock().expect("lock").push(("get_object_fields".to_string(), args.clone()));
        Ok(OperationResult::json(&json!([{"name": "Name", "type": "string"}])))
    }

    async fn delete_object_fields(&self, _args: &ArgumentMapping) -> HandlerResult {
        Ok(OperationResult::error_text("Failed: Account.Foo__c: field not found"))
    }
}

fn runtime(llm: Arc<ScriptedLlm>, org: Arc<FakeOrg>) -> AgentRuntime {
    AgentRuntime::new(llm, Dispatcher::new(org))
}

#[tokio::test]
async fn plain_reply_is_rendered_without_dispatch() {
    let llm = ScriptedLlm::new(vec![Ok("Here is the answer: 42".to_string())]);
    let org = Arc::new(FakeOrg::default());
    let runtime = runtime(llm.clone(), org.clone());
    let mut session = runtime.start_session();

    let outcome = runtime.handle_turn(&mut session, "what is six times seven?").await;

    assert_eq!(outcome, TurnOutcome::Reply("Here is the answer: 42".to_string()));
    assert!(org.calls.lock().expect("lock").is_empty());
    assert_eq!(llm.requests().len(), 1);
    assert_eq!(session.transcript.len(), 3);
    assert_eq!(session.transcript.last_role(), Role::Assistant);
}

#[tokio::test]
async fn directive_is_dispatched_and_summarized() {
    let llm = ScriptedLlm::new(vec![
        Ok("run: get_object_fields\nargs: { object_name: “Account” }".to_string()),
        Ok("Account has a Name field.".to_string()),
    ]);
    let org = Arc::new(FakeOrg::default());
    let runtime = runtime(llm.clone(), org.clone());
    let mut session = runtime.start_session();

    let outcome = runtime.handle_turn(&mut session, "Which fields does Account have?").await;

    assert_eq!(
        outcome,
        TurnOutcome::Summary {
            operation: "get_object_fields".to_string(),
            text: "Account has a Name field.".to_string(),
        }
    );
    let calls = org.calls.lock().expect("lock").clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(serde_json::Value::Object(calls[0].1.clone()), json!({"object_name": "Account"}));

    let requests = llm.requests();
    assert_eq!(requests[0].temperature, Some(0.3));
    assert_eq!(requests[0].messages[0].role, Role::System);
    assert_eq!(requests[1].temperature, None);
    assert!(requests[1].messages[1].content.starts_with("User query: Which fields does Account have?"));
    assert!(requests[1].messages[1].content.contains("\"name\": \"Name\""));

    // system, user, directive, summary
    assert_eq!(session.transcript.len(), 4);
    assert_eq!(session.transcript.entries()[3].content, "Account has a Name field.");
}

#[tokio::test]
async fn failed_model_call_leaves_only_the_user_entry() {
    let llm = ScriptedLlm::new(vec![Err(LlmError::MissingReply("unknown".to_string()))]);
    let runtime = runtime(llm, Arc::new(FakeOrg::default()));
    let mut session = runtime.start_session();

    let outcome = runtime.handle_turn(&mut session, "hello").await;

    assert!(outcome.render().starts_with("Request failed:"));
    assert_eq!(session.transcript.len(), 2);
    assert_eq!(session.transcript.last_role(), Role::User);
}

#[tokio::test]
async fn unknown_operation_becomes_a_tool_error_and_session_continues() {
    let llm = ScriptedLlm::new(vec![
        Ok("run: format_org\nargs: {}".to_string()),
        Ok("Sure, anything else?".to_string()),
    ]);
    let runtime = runtime(llm.clone(), Arc::new(FakeOrg::default()));
    let mut session = runtime.start_session();

    let outcome = runtime.handle_turn(&mut session, "wipe everything").await;
    assert_eq!(
        outcome,
        TurnOutcome::Failed(TurnError::Dispatch(DispatchError::UnknownOperation {
            name: "format_org".to_string(),
        }))
    );
    assert_eq!(outcome.render(), "Tool error: unknown operation: format_org");
    assert_eq!(session.transcript.len(), 3);

    let next = runtime.handle_turn(&mut session, "never mind").await;
    assert_eq!(next, TurnOutcome::Reply("Sure, anything else?".to_string()));
    assert_eq!(llm.requests()[1].messages.len(), 4);
}

#[tokio::test]
async fn malformed_directive_and_bad_arguments_are_tool_errors() {
    let llm = ScriptedLlm::new(vec![
        Ok("run: get_object_fields".to_string()),
        Ok("run: get_object_fields\nargs: { object_name: 'Account' }".to_string()),
    ]);
    let org = Arc::new(FakeOrg::default());
    let runtime = runtime(llm, org.clone());
    let mut session = runtime.start_session();

    let malformed = runtime.handle_turn(&mut session, "fields?").await;
    assert!(matches!(malformed, TurnOutcome::Failed(TurnError::Directive(_))));

    let unparseable = runtime.handle_turn(&mut session, "fields of Account?").await;
    assert!(matches!(unparseable, TurnOutcome::Failed(TurnError::Arguments(_))));
    assert!(unparseable.render().starts_with("Tool error:"));

    assert!(org.calls.lock().expect("lock").is_empty());
    assert_eq!(session.transcript.len(), 5);
}

#[tokio::test]
async fn in_band_operation_errors_skip_the_summary() {
    let llm = ScriptedLlm::new(vec![Ok(
        "run: delete_object_fields\nargs: { object_name: \"Account\", field_names: [\"Foo__c\",] }"
            .to_string(),
    )]);
    let runtime = runtime(llm.clone(), Arc::new(FakeOrg::default()));
    let mut session = runtime.start_session();

    let outcome = runtime.handle_turn(&mut session, "drop Foo").await;

    assert!(matches!(outcome, TurnOutcome::Failed(TurnError::OperationReported { .. })));
    assert!(outcome.render().contains("field not found"));
    assert_eq!(llm.requests().len(), 1);
}

struct OfflineOrg;

#[async_trait]
impl OperationHandlers for OfflineOrg {
    fn is_connected(&self) -> bool {
        false
    }
}

#[test]
fn capability_description_follows_liveness() {
    let llm = ScriptedLlm::new(Vec::new());

    let offline = AgentRuntime::new(llm.clone(), Dispatcher::new(Arc::new(OfflineOrg)));
    let offline_entry = offline.start_session().transcript.entries()[0].content.clone();
    assert!(offline_entry.contains("- run_soql_query: "));
    for restricted in ["create_record", "delete_object_fields", "create_tab", "create_custom_app"] {
        assert!(!offline_entry.contains(&format!("- {restricted}: ")), "{restricted} offered");
    }

    let online = runtime(llm, Arc::new(FakeOrg::default()));
    let online_entry = online.start_session().transcript.entries()[0].content.clone();
    assert!(online_entry.contains("- create_record: "));
}
