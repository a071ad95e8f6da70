//! Best-effort recovery of structured payloads from loosely formatted JSON.
//!
//! The contract is "recover known malformations or give up": a failed
//! recovery is signalled by handing back the original string, never by an
//! error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Result of running the recoverer over a string.
#[derive(Debug, Clone, PartialEq)]
pub enum Recovered {
    /// The text parsed (possibly after repair) into a JSON value.
    Structured(Value),
    /// The original input, untouched. Callers treat this as opaque text.
    Text(String),
}

impl Recovered {
    /// Returns the structured value, if any.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// True when the recovered value is a JSON object or array.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Structured(Value::Object(_) | Value::Array(_)))
    }

    /// Converts back into a JSON value; unparsed text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            Self::Structured(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

/// A named textual repair applied before retrying a strict parse.
pub struct RepairRule {
    /// Stable name used in logs and tests.
    pub name: &'static str,
    apply: fn(&str) -> Option<String>,
}

impl RepairRule {
    /// Applies the rule, returning `None` when it does not match.
    pub fn apply(&self, text: &str) -> Option<String> {
        (self.apply)(text)
    }
}

const ESCAPED_CONTENT_TYPE: &str = r#"\"content_type""#;

static UNTERMINATED_INNER_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"content":"\{(.*?)\}\\"content_type""#)
        .expect("static repair pattern is valid")
});

/// Repairs, in the order they are tried. Each rule rewrites the trimmed
/// input; the first rewrite that parses wins.
pub static REPAIR_RULES: &[RepairRule] = &[
    RepairRule {
        name: "escaped-content-type-quote",
        apply: repair_escaped_content_type_quote,
    },
    RepairRule {
        name: "unterminated-inner-content",
        apply: repair_unterminated_inner_content,
    },
];

/// The last string of an inner `content` object lost its closing quote and
/// the object its closing brace: `..."urls":"https://...\"content_type"`.
fn repair_escaped_content_type_quote(text: &str) -> Option<String> {
    text.contains(ESCAPED_CONTENT_TYPE)
        .then(|| text.replacen(ESCAPED_CONTENT_TYPE, r#""},"content_type""#, 1))
}

/// `"content":"{...}\"content_type"` is missing the quote that ends the
/// inner string.
fn repair_unterminated_inner_content(text: &str) -> Option<String> {
    UNTERMINATED_INNER_CONTENT.is_match(text).then(|| {
        UNTERMINATED_INNER_CONTENT
            .replace(text, r#""content":"{${1}}","content_type""#)
            .into_owned()
    })
}

/// Attempts to parse `input` as JSON, repairing known malformations.
///
/// Input that is blank or does not open with `{` or `[` is returned as text
/// without any parse attempt.
pub fn recover(input: &str) -> Recovered {
    let trimmed = input.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Recovered::Text(input.to_string());
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Recovered::Structured(value);
    }

    for rule in REPAIR_RULES {
        let Some(repaired) = rule.apply(trimmed) else {
            continue;
        };
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            debug!(rule = rule.name, "recovered malformed payload");
            return Recovered::Structured(value);
        }
    }
    Recovered::Text(input.to_string())
}

/// Applies [`recover`] to a value that may itself be a JSON string.
///
/// Non-string values are already structured and are returned as is.
pub fn recover_value(value: Value) -> Recovered {
    match value {
        Value::String(text) => recover(&text),
        other => Recovered::Structured(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_json_is_returned_structurally() {
        let recovered = recover(r#" {"title":"t","content":"x"} "#);
        assert_eq!(
            recovered,
            Recovered::Structured(json!({"title":"t","content":"x"}))
        );
        assert_eq!(recover("[1,2]"), Recovered::Structured(json!([1, 2])));
    }

    #[test]
    fn plain_text_is_returned_unchanged() {
        for input in ["hello", "", "   ", " 42", "\"quoted\""] {
            assert_eq!(recover(input), Recovered::Text(input.to_string()));
        }
    }

    #[test]
    fn unrepairable_json_falls_back_to_original_string() {
        let input = "{\"content\": broken";
        assert_eq!(recover(input), Recovered::Text(input.to_string()));
    }

    #[test]
    fn repairs_unclosed_inner_object_before_content_type() {
        let input = r#"{"content":{"title":"T","urls":"https://x.test\"content_type":"text"}"#;
        assert!(serde_json::from_str::<Value>(input).is_err());
        assert_eq!(
            recover(input),
            Recovered::Structured(json!({
                "content": {"title":"T","urls":"https://x.test"},
                "content_type": "text"
            }))
        );
    }

    #[test]
    fn repairs_unterminated_inner_content_string() {
        let input = r#"{"content":"{\"title\":\"T\"}\"content_type":"text"}"#;
        assert!(serde_json::from_str::<Value>(input).is_err());
        let recovered = recover(input);
        let value = recovered.as_value().expect("repaired");
        assert_eq!(value["content_type"], "text");
        let inner = value["content"].as_str().expect("inner string");
        assert_eq!(recover(inner), Recovered::Structured(json!({"title":"T"})));
    }

    #[test]
    fn unterminated_inner_content_rule_closes_the_string() {
        let rule = &REPAIR_RULES[1];
        assert_eq!(rule.name, "unterminated-inner-content");
        let repaired = rule
            .apply("{\"content\":\"{a\nb}\\\"content_type\":\"text\"}")
            .expect("matches");
        assert_eq!(repaired, "{\"content\":\"{a\nb}\",\"content_type\":\"text\"}");
        assert!(rule.apply("{\"content\":\"x\"}").is_none());
    }

    #[test]
    fn escaped_content_type_rule_replaces_first_occurrence_only() {
        let rule = &REPAIR_RULES[0];
        let repaired = rule
            .apply(r#"a\"content_type"b\"content_type""#)
            .expect("matches");
        assert_eq!(repaired, r#"a"},"content_type"b\"content_type""#);
    }

    #[test]
    fn recovery_is_idempotent() {
        let inputs = [
            r#"{"a":1}"#,
            "plain",
            "{\"content\": broken",
            r#"{"content":"{\"title\":\"T\"}\"content_type":"text"}"#,
        ];
        for input in inputs {
            let once = recover(input);
            let twice = recover_value(once.clone().into_value());
            assert_eq!(twice, once, "input: {input}");
        }
    }
}
