use thiserror::Error;

pub const DIRECTIVE_MARKER: &str = "run:";
pub const ARGUMENTS_LABEL: &str = "args:";

/// Request to invoke one operation, lifted from an assistant reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationDirective {
    pub operation_name: String,
    pub raw_arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Plain(String),
    Directive(InvocationDirective),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("malformed directive: expected an argument line after `{first_line}`")]
    MissingArguments { first_line: String },
    #[error("malformed directive: no operation name after `run:`")]
    MissingOperation,
}

/// Classify an assistant reply. Only text whose trimmed form starts with the
/// case-sensitive `run:` marker is a directive; everything else is plain.
pub fn parse_reply(reply: &str) -> Result<Reply, DirectiveError> {
    let trimmed = reply.trim();
    if !trimmed.starts_with(DIRECTIVE_MARKER) {
        return Ok(Reply::Plain(reply.to_string()));
    }

    let Some((first_line, rest)) = trimmed.split_once('\n') else {
        return Err(DirectiveError::MissingArguments { first_line: trimmed.to_string() });
    };

    let operation_name = first_line.trim_start_matches(DIRECTIVE_MARKER).trim();
    if operation_name.is_empty() {
        return Err(DirectiveError::MissingOperation);
    }

    let rest = rest.trim();
    let raw_arguments = rest.strip_prefix(ARGUMENTS_LABEL).unwrap_or(rest).trim();

    Ok(Reply::Directive(InvocationDirective {
        operation_name: operation_name.to_string(),
        raw_arguments: raw_arguments.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::{parse_reply, DirectiveError, InvocationDirective, Reply};

    #[test]
    fn directive_yields_name_and_argument_block() {
        let reply = parse_reply("run: get_object_fields\nargs: { object_name: “Account” }");
        assert_eq!(
            reply,
            Ok(Reply::Directive(InvocationDirective {
                operation_name: "get_object_fields".to_string(),
                raw_arguments: "{ object_name: “Account” }".to_string(),
            }))
        );
    }

    #[test]
    fn argument_block_may_span_lines() {
        let reply = parse_reply("  run: create_record\r\nargs: {\n  object_name: \"Account\",\n}\n");
        let Ok(Reply::Directive(directive)) = reply else {
            panic!("expected directive, got {reply:?}");
        };
        assert_eq!(directive.operation_name, "create_record");
        assert_eq!(directive.raw_arguments, "{\n  object_name: \"Account\",\n}");
    }

    #[test]
    fn argument_label_is_optional() {
        let reply = parse_reply("run: describe_object\n{ object_name: \"Account\" }");
        assert_eq!(
            reply,
            Ok(Reply::Directive(InvocationDirective {
                operation_name: "describe_object".to_string(),
                raw_arguments: "{ object_name: \"Account\" }".to_string(),
            }))
        );
    }

    #[test]
    fn text_without_marker_is_plain_and_verbatim() {
        for text in ["Here is the answer: 42", "Run: describe_object\nargs: {}", " I can run: that"] {
            assert_eq!(parse_reply(text), Ok(Reply::Plain(text.to_string())));
        }
    }

    #[test]
    fn marker_without_second_line_is_malformed() {
        assert_eq!(
            parse_reply("run: describe_object"),
            Err(DirectiveError::MissingArguments { first_line: "run: describe_object".to_string() })
        );
        assert_eq!(parse_reply("run:   \nargs: {}"), Err(DirectiveError::MissingOperation));
    }
}
