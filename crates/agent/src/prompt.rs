use sfmcp_core::OperationDescriptor;

use crate::llm::{ChatMessage, ChatRequest};

const PREAMBLE: [&str; 4] = [
    "You are a helpful assistant for Salesforce MCP tools.",
    "Your job is to interpret user requests and call the correct tool once all arguments are available",
    "Parse with:\nrun: <tool_name>\nargs: { ... }",
    "Use only the tools below:\n",
];

pub const SUMMARY_INSTRUCTIONS: &str = "You are a helpful assistant summarizing Salesforce query results.\n\
The user asked a question, and the system responded with raw data from Salesforce.\n\
Your task is to translate that raw data into a clear, concise, natural language summary that \
directly answers the user's question. Provide Salesforce URLs only when available.\n\
Avoid repeating raw JSON, query syntax, or technical jargon.";

/// System entry listing the given operations and their required arguments.
pub fn capability_description(descriptors: &[OperationDescriptor]) -> String {
    let mut lines = PREAMBLE.iter().map(|line| line.to_string()).collect::<Vec<_>>();
    for descriptor in descriptors {
        lines.push(format!("- {}: {}", descriptor.name, descriptor.description));
        if !descriptor.required_arguments.is_empty() {
            lines.push(format!("  Required: {}", descriptor.required_arguments.join(", ")));
        }
    }
    lines.join("\n")
}

/// Second model call of a turn: only the summarization instructions and the raw output.
pub fn summary_request(question: &str, output: &str) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::system(SUMMARY_INSTRUCTIONS),
            ChatMessage::user(format!("User query: {question}\n\nSalesforce response:\n{output}")),
        ],
        temperature: None,
    }
}

#[cfg(test)]
mod tests {
    use sfmcp_core::Registry;

    use super::{capability_description, summary_request};
    use crate::llm::Role;

    #[test]
    fn description_lists_operations_with_required_arguments() {
        let registry = Registry::catalog();
        let description = capability_description(registry.list());

        assert!(description.starts_with("You are a helpful assistant for Salesforce MCP tools."));
        assert!(description.contains("run: <tool_name>\nargs: { ... }"));
        for descriptor in registry.list() {
            assert!(description.contains(&format!("- {}: ", descriptor.name)));
        }
        assert!(description.contains("  Required: query"));
    }

    #[test]
    fn summary_request_has_no_temperature() {
        let request = summary_request("How many accounts?", "{\"totalSize\": 3}");
        assert_eq!(request.temperature, None);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(
            request.messages[1].content,
            "User query: How many accounts?\n\nSalesforce response:\n{\"totalSize\": 3}"
        );
    }
}
