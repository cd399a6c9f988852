//! Repairs the near-JSON argument blocks models emit: typographic quotes, bare keys
//! and trailing commas. Each rule tracks string literals so quoted values are never
//! rewritten, and each is idempotent on its own.
//!
//! A string opened with an ASCII `"` is closed only by an ASCII `"`. Text such as
//! `{ name: "X”, other: 1 }` therefore stays unterminated and fails to parse.

use serde_json::Value;
use sfmcp_core::ArgumentMapping;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("could not parse arguments `{original}`: {diagnostic}")]
    Unparseable { original: String, diagnostic: String },
    #[error("arguments must be an object, got `{original}`")]
    NotAnObject { original: String },
}

/// Tracks whether the scan is inside an ASCII double-quoted string literal.
#[derive(Default)]
struct Literal {
    in_string: bool,
    escaped: bool,
}

impl Literal {
    /// Returns true when `ch` belongs to a string literal, delimiters included.
    fn advance(&mut self, ch: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.in_string = false;
            }
            true
        } else if ch == '"' {
            self.in_string = true;
            true
        } else {
            false
        }
    }
}

const fn is_curly_double(ch: char) -> bool {
    matches!(ch, '\u{201C}' | '\u{201D}')
}

const fn is_curly_single(ch: char) -> bool {
    matches!(ch, '\u{2018}' | '\u{2019}')
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    Outside,
    Ascii { escaped: bool },
    Curly { escaped: bool },
}

/// Curly double quotes become `"` and curly single quotes become `'`, except inside
/// strings that were already delimited with ASCII quotes. A string opened by a curly
/// quote may be closed by either curly variant or by `"`.
pub fn normalize_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = QuoteState::Outside;

    for ch in text.chars() {
        state = match state {
            QuoteState::Outside => {
                if ch == '"' {
                    out.push('"');
                    QuoteState::Ascii { escaped: false }
                } else if is_curly_double(ch) {
                    out.push('"');
                    QuoteState::Curly { escaped: false }
                } else {
                    out.push(if is_curly_single(ch) { '\'' } else { ch });
                    QuoteState::Outside
                }
            }
            QuoteState::Ascii { escaped } => {
                out.push(ch);
                match ch {
                    _ if escaped => QuoteState::Ascii { escaped: false },
                    '\\' => QuoteState::Ascii { escaped: true },
                    '"' => QuoteState::Outside,
                    _ => QuoteState::Ascii { escaped: false },
                }
            }
            QuoteState::Curly { escaped: true } => {
                out.push(ch);
                QuoteState::Curly { escaped: false }
            }
            QuoteState::Curly { escaped: false } => {
                if ch == '"' || is_curly_double(ch) {
                    out.push('"');
                    QuoteState::Outside
                } else if ch == '\\' {
                    out.push(ch);
                    QuoteState::Curly { escaped: true }
                } else {
                    out.push(if is_curly_single(ch) { '\'' } else { ch });
                    QuoteState::Curly { escaped: false }
                }
            }
        };
    }

    out
}

fn is_key_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// `{ key: 1, other_key: 2 }` becomes `{ "key": 1, "other_key": 2 }`. Only identifier
/// runs directly after `{` or `,` and directly before `:` are quoted.
pub fn quote_bare_keys(text: &str) -> String {
    let chars = text.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(text.len() + 8);
    let mut literal = Literal::default();
    let mut last_significant = None;
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        if literal.advance(ch) {
            out.push(ch);
            last_significant = Some('"');
            index += 1;
            continue;
        }

        if matches!(last_significant, Some('{' | ',')) && is_key_char(ch) {
            let key_end = chars[index..]
                .iter()
                .position(|candidate| !is_key_char(*candidate))
                .map_or(chars.len(), |offset| index + offset);
            let colon = chars[key_end..]
                .iter()
                .position(|candidate| !candidate.is_whitespace())
                .map(|offset| key_end + offset);
            if colon.is_some_and(|position| chars[position] == ':') {
                out.push('"');
                out.extend(&chars[index..key_end]);
                out.push('"');
                last_significant = Some('"');
                index = key_end;
                continue;
            }
        }

        out.push(ch);
        if !ch.is_whitespace() {
            last_significant = Some(ch);
        }
        index += 1;
    }

    out
}

/// Drops commas that only precede whitespace, further commas, and then `}` or `]`.
pub fn strip_trailing_commas(text: &str) -> String {
    let chars = text.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(text.len());
    let mut literal = Literal::default();

    for (index, &ch) in chars.iter().enumerate() {
        if literal.advance(ch) {
            out.push(ch);
            continue;
        }
        if ch == ',' {
            let next = chars[index + 1..]
                .iter()
                .find(|candidate| !candidate.is_whitespace() && **candidate != ',')
                .copied();
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        out.push(ch);
    }

    out
}

pub fn sanitize(text: &str) -> String {
    strip_trailing_commas(&quote_bare_keys(&normalize_quotes(text)))
}

/// Sanitize then strictly parse; the result must be a JSON object.
pub fn parse_arguments(raw: &str) -> Result<ArgumentMapping, ArgumentError> {
    let repaired = sanitize(raw);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(arguments)) => Ok(arguments),
        Ok(_) => Err(ArgumentError::NotAnObject { original: raw.to_string() }),
        Err(error) => Err(ArgumentError::Unparseable {
            original: raw.to_string(),
            diagnostic: error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{
        normalize_quotes, parse_arguments, quote_bare_keys, sanitize, strip_trailing_commas,
        ArgumentError,
    };

    /// Inputs that stress literal tracking: quoted punctuation, escapes, curly quotes,
    /// and broken text.
    const TRICKY: &[&str] = &[
        "",
        "{}",
        "{ object_name: “Account” }",
        "{ name: \"X\", fields: [1,2,],}",
        "{ \"note\": \"a, b,}\", tail: 1, }",
        "{ \"sql\": \"SELECT Id FROM A WHERE Name = 'x: {y}'\" }",
        "{ label: “It’s done”, other: ‘single’ }",
        "{ \"esc\": \"quote \\\" inside, }\", k: [ , ] }",
        "{ “curly key”: “value, with: colon” , }",
        "{ a: { b: { c: [1, 2, 3,], }, }, }",
        "{ broken: \"unterminated, }",
        "run: nothing here",
        "[1,,]",
        "{ ,key : 1 }",
        "{ k: \"back\\\\slash\", }",
        "{ “mixed\" : 1 }",
        "{ name: \"X”, other: 1 }",
    ];

    fn value(text: &str) -> Value {
        serde_json::from_str(text).unwrap_or_else(|error| panic!("`{text}` is not JSON: {error}"))
    }

    #[test]
    fn directive_arguments_with_curly_quotes_parse() {
        assert_eq!(sanitize("{ object_name: “Account” }"), "{ \"object_name\": \"Account\" }");
        let arguments = parse_arguments("{ object_name: “Account” }").expect("parse");
        assert_eq!(Value::Object(arguments), json!({"object_name": "Account"}));
    }

    #[test]
    fn bare_keys_and_trailing_commas_are_repaired() {
        let arguments = parse_arguments("{ name: \"X\", fields: [1,2,],}").expect("parse");
        assert_eq!(Value::Object(arguments), json!({"name": "X", "fields": [1, 2]}));
    }

    #[test]
    fn every_rule_is_idempotent() {
        for input in TRICKY {
            let once = normalize_quotes(input);
            assert_eq!(normalize_quotes(&once), once, "normalize_quotes on {input:?}");
            let once = quote_bare_keys(input);
            assert_eq!(quote_bare_keys(&once), once, "quote_bare_keys on {input:?}");
            let once = strip_trailing_commas(input);
            assert_eq!(strip_trailing_commas(&once), once, "strip_trailing_commas on {input:?}");
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "sanitize on {input:?}");
        }
    }

    #[test]
    fn strict_json_round_trips_unchanged() {
        let mappings = [
            json!({}),
            json!({"object_name": "Account"}),
            json!({"query": "SELECT Id, Name FROM Account WHERE Name = 'a, b'"}),
            json!({"text": "commas, colons: and {braces} [brackets],}"}),
            json!({"quote": "she said \"hi\", then left", "path": "C:\\temp\\"}),
            json!({"curly": "“already” ‘inside’ a string"}),
            json!({"nested": {"fields": [{"label": "A", "required": true}, 1, 2.5, null]}}),
            json!({"empty_list": [], "empty_object": {}, "flag": false}),
        ];

        for mapping in mappings {
            for rendered in [
                serde_json::to_string(&mapping).expect("render"),
                serde_json::to_string_pretty(&mapping).expect("render"),
            ] {
                assert_eq!(sanitize(&rendered), rendered);
                let parsed = parse_arguments(&rendered).expect("round trip");
                assert_eq!(Value::Object(parsed), mapping);
            }
        }
    }

    #[test]
    fn quoted_punctuation_is_left_alone() {
        let repaired = sanitize("{ note: \"a, b,}\", sql: \"x: {y}, ]\", }");
        assert_eq!(value(&repaired), json!({"note": "a, b,}", "sql": "x: {y}, ]"}));

        let repaired = sanitize("{ “curly key”: “value, with: colon” , }");
        assert_eq!(value(&repaired), json!({"curly key": "value, with: colon"}));

        let repaired = sanitize("{ k: \"escaped \\\" quote, }\", }");
        assert_eq!(value(&repaired), json!({"k": "escaped \" quote, }"}));
    }

    #[test]
    fn curly_single_quotes_inside_curly_strings_become_apostrophes() {
        let repaired = sanitize("{ label: “It’s done” }");
        assert_eq!(value(&repaired), json!({"label": "It's done"}));
        assert_eq!(normalize_quotes("{\"a\": \"It’s\"}"), "{\"a\": \"It’s\"}");
    }

    #[test]
    fn ascii_opened_string_is_not_closed_by_curly_quote() {
        let input = "{ name: \"X”, other: 1 }";
        assert_eq!(normalize_quotes(input), input);
        assert_eq!(sanitize(input), "{ \"name\": \"X”, other: 1 }");
        assert!(matches!(parse_arguments(input), Err(ArgumentError::Unparseable { .. })));
    }

    #[test]
    fn array_values_are_not_mistaken_for_keys() {
        assert_eq!(quote_bare_keys("[1, true, null]"), "[1, true, null]");
        assert_eq!(quote_bare_keys("{a:1,b :2}"), "{\"a\":1,\"b\" :2}");
    }

    #[test]
    fn failures_carry_original_text_and_diagnostic() {
        let error = parse_arguments("{ name: 'single quoted' }").expect_err("invalid");
        let ArgumentError::Unparseable { original, diagnostic } = error else {
            panic!("expected unparseable");
        };
        assert_eq!(original, "{ name: 'single quoted' }");
        assert!(!diagnostic.is_empty());

        assert_eq!(
            parse_arguments("[1, 2]"),
            Err(ArgumentError::NotAnObject { original: "[1, 2]".to_string() })
        );
        assert!(matches!(parse_arguments(""), Err(ArgumentError::Unparseable { .. })));
    }
}
