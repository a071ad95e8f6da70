use serde_json::Value;

use crate::recover::{Recovered, recover_value};

/// Node key used when a payload names neither a node id nor a node title.
pub const UNKNOWN_NODE: &str = "unknown";

/// Which optional fields a pipeline instance reads from payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    /// Title, body text and a link (`urls`).
    #[default]
    WithLink,
    /// Title and body text only.
    TextOnly,
}

/// Normalized view of one content event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CanonicalPayload {
    pub node_id: Option<String>,
    pub node_title: Option<String>,
    pub node_type: Option<String>,
    pub node_finished: bool,
    pub title: String,
    /// Always `None` for [`PayloadShape::TextOnly`].
    pub link: Option<String>,
    /// Full cumulative text reported by the event.
    pub text: String,
}

impl CanonicalPayload {
    /// Identity of the node stream this payload belongs to.
    pub fn node_key(&self) -> &str {
        [self.node_id.as_deref(), self.node_title.as_deref()]
            .into_iter()
            .flatten()
            .find(|key| !key.is_empty())
            .unwrap_or(UNKNOWN_NODE)
    }
}

/// Picks the value handed to [`extract_payload`] for a content event.
///
/// `Message` events use the recovered payload as is; other event names fall
/// back to wrapping the raw data as `{"content": data}` when it did not
/// recover into an object or array.
pub fn content_source(event: &str, recovered: &Recovered, raw_data: &str) -> Value {
    if event == "Message" || event == "message" {
        return match recovered {
            Recovered::Structured(value) => value.clone(),
            Recovered::Text(_) => Value::Null,
        };
    }
    match recovered.as_value() {
        Some(value) if recovered.is_container() => value.clone(),
        _ => serde_json::json!({ "content": raw_data }),
    }
}

/// Resolves the canonical record from an event payload.
///
/// Total: absent fields resolve to empty strings, `None` or `false`.
pub fn extract_payload(outer: &Value, shape: PayloadShape) -> CanonicalPayload {
    let inner = match present(outer, "content").or_else(|| present(outer, "cotent")) {
        Some(value) => recover_value(value.clone()).into_value(),
        None => Value::String(String::new()),
    };

    let title = present(&inner, "title")
        .or_else(|| present(outer, "title"))
        .and_then(display_text)
        .unwrap_or_default();
    let link = match shape {
        PayloadShape::WithLink => present(&inner, "urls")
            .or_else(|| present(outer, "urls"))
            .and_then(display_text),
        PayloadShape::TextOnly => None,
    };
    let body = present(&inner, "cotent")
        .or_else(|| present(&inner, "content"))
        .unwrap_or(&inner);

    CanonicalPayload {
        node_id: present(outer, "node_id").and_then(display_text),
        node_title: present(outer, "node_title").and_then(display_text),
        node_type: present(outer, "node_type").and_then(display_text),
        node_finished: present(outer, "node_is_finish").is_some_and(truthy),
        title,
        link,
        text: body_text(body),
    }
}

/// Field lookup where an explicit `null` counts as absent.
fn present<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

pub(crate) fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn body_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recover::recover;
    use serde_json::json;

    #[test]
    fn nested_content_string_is_recovered() {
        let outer = json!({
            "node_id": "n1",
            "node_title": "LLM",
            "node_is_finish": false,
            "content": "{\"title\":\"Inner\",\"urls\":\"https://v.test/1\",\"cotent\":\"hello\"}"
        });
        let payload = extract_payload(&outer, PayloadShape::WithLink);
        assert_eq!(payload.title, "Inner");
        assert_eq!(payload.link.as_deref(), Some("https://v.test/1"));
        assert_eq!(payload.text, "hello");
        assert_eq!(payload.node_key(), "n1");
        assert!(!payload.node_finished);
    }

    #[test]
    fn outer_fields_fill_in_and_misspelled_content_is_accepted() {
        let outer = json!({
            "title": "Outer",
            "urls": "https://v.test/2",
            "node_title": "End",
            "node_is_finish": 1,
            "cotent": "plain body"
        });
        let payload = extract_payload(&outer, PayloadShape::WithLink);
        assert_eq!(payload.title, "Outer");
        assert_eq!(payload.link.as_deref(), Some("https://v.test/2"));
        assert_eq!(payload.text, "plain body");
        assert_eq!(payload.node_key(), "End");
        assert!(payload.node_finished);
    }

    #[test]
    fn text_only_shape_never_reports_a_link() {
        let outer = json!({"urls": "https://v.test", "content": "x"});
        assert_eq!(extract_payload(&outer, PayloadShape::TextOnly).link, None);
    }

    #[test]
    fn structured_body_is_pretty_printed() {
        let outer = json!({"content": {"items": [1, 2]}});
        let payload = extract_payload(&outer, PayloadShape::TextOnly);
        assert_eq!(payload.text, "{\n  \"items\": [\n    1,\n    2\n  ]\n}");

        let outer = json!({"content": {"content": 42}});
        assert_eq!(extract_payload(&outer, PayloadShape::TextOnly).text, "42");
    }

    #[test]
    fn missing_fields_resolve_to_empty_values() {
        for outer in [json!({}), json!(null), json!("text"), json!({"content": null})] {
            let payload = extract_payload(&outer, PayloadShape::WithLink);
            assert_eq!(payload, CanonicalPayload::default());
            assert_eq!(payload.node_key(), UNKNOWN_NODE);
        }
    }

    #[test]
    fn empty_node_id_falls_through_to_title() {
        let payload = extract_payload(
            &json!({"node_id": "", "node_title": "Summarize"}),
            PayloadShape::TextOnly,
        );
        assert_eq!(payload.node_key(), "Summarize");
    }

    #[test]
    fn numeric_node_ids_are_rendered_as_text() {
        let payload = extract_payload(&json!({"node_id": 900}), PayloadShape::TextOnly);
        assert_eq!(payload.node_id.as_deref(), Some("900"));
    }

    #[test]
    fn content_source_wraps_unparsed_data_for_custom_events() {
        let data = "just text";
        let recovered = recover(data);
        assert_eq!(
            content_source("Custom", &recovered, data),
            json!({"content": "just text"})
        );
        assert_eq!(content_source("Message", &recovered, data), Value::Null);

        let data = r#"{"content":"x"}"#;
        let recovered = recover(data);
        assert_eq!(content_source("message", &recovered, data), json!({"content": "x"}));
        assert_eq!(content_source("Other", &recovered, data), json!({"content": "x"}));
        let data = r#"["a","b"]"#;
        let recovered = recover(data);
        assert!(recovered.is_container());
        assert_eq!(content_source("Other", &recovered, data), json!(["a", "b"]));
    }
}
