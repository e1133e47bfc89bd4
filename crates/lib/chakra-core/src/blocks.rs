//! Builders for block payloads accepted by the remote block endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const DEFAULT_CODE_LANGUAGE: &str = "plain text";
pub const DEFAULT_CALLOUT_EMOJI: &str = "💡";

/// Text styling flags for a rich text span. Unset flags are omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Annotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Rich text span with optional styling and link.
#[must_use]
pub fn text(content: &str, annotations: Option<&Annotations>, link: Option<&str>) -> Value {
    let link = link.map_or(Value::Null, |url| json!({ "url": url }));
    let mut span = json!({
        "type": "text",
        "text": { "content": content, "link": link },
    });
    if let (Some(annotations), Some(map)) = (annotations, span.as_object_mut()) {
        map.insert("annotations".to_string(), json!(annotations));
    }
    span
}

fn block(kind: &str, body: Value) -> Value {
    json!({
        "object": "block",
        "type": kind,
        kind: body,
    })
}

fn rich_text_body(span: Value) -> Value {
    json!({ "rich_text": [span] })
}

#[must_use]
pub fn paragraph(content: &str, annotations: Option<&Annotations>, link: Option<&str>) -> Value {
    block("paragraph", rich_text_body(text(content, annotations, link)))
}

/// Heading block; `level` outside 1..=3 is clamped into range.
#[must_use]
pub fn heading(level: u8, content: &str) -> Value {
    let kind = match level {
        0 | 1 => "heading_1",
        2 => "heading_2",
        _ => "heading_3",
    };
    block(kind, rich_text_body(text(content, None, None)))
}

#[must_use]
pub fn bulleted_list_item(content: &str, annotations: Option<&Annotations>) -> Value {
    block("bulleted_list_item", rich_text_body(text(content, annotations, None)))
}

#[must_use]
pub fn numbered_list_item(content: &str, annotations: Option<&Annotations>) -> Value {
    block("numbered_list_item", rich_text_body(text(content, annotations, None)))
}

#[must_use]
pub fn to_do(content: &str, checked: bool) -> Value {
    block(
        "to_do",
        json!({
            "rich_text": [text(content, None, None)],
            "checked": checked,
        }),
    )
}

/// Toggle block; nested children are only attached when present.
#[must_use]
pub fn toggle(content: &str, children: Vec<Value>) -> Value {
    let mut body = rich_text_body(text(content, None, None));
    if !children.is_empty()
        && let Some(map) = body.as_object_mut()
    {
        map.insert("children".to_string(), Value::Array(children));
    }
    block("toggle", body)
}

#[must_use]
pub fn code(content: &str, language: Option<&str>) -> Value {
    block(
        "code",
        json!({
            "rich_text": [text(content, None, None)],
            "language": language.unwrap_or(DEFAULT_CODE_LANGUAGE),
        }),
    )
}

#[must_use]
pub fn callout(content: &str, emoji: Option<&str>) -> Value {
    block(
        "callout",
        json!({
            "rich_text": [text(content, None, None)],
            "icon": { "type": "emoji", "emoji": emoji.unwrap_or(DEFAULT_CALLOUT_EMOJI) },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_carries_annotations_and_link() {
        let bold = Annotations {
            bold: Some(true),
            ..Annotations::default()
        };
        let value = paragraph("hello", Some(&bold), Some("https://example.com"));
        assert_eq!(
            value,
            json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": {
                    "rich_text": [{
                        "type": "text",
                        "text": { "content": "hello", "link": { "url": "https://example.com" } },
                        "annotations": { "bold": true }
                    }]
                }
            })
        );
    }

    #[test]
    fn plain_text_has_null_link_and_no_annotations() {
        let span = text("plain", None, None);
        assert_eq!(span["text"]["link"], Value::Null);
        assert!(span.get("annotations").is_none());
    }

    #[test]
    fn heading_levels_map_to_block_types() {
        assert_eq!(heading(1, "a")["type"], "heading_1");
        assert_eq!(heading(2, "a")["type"], "heading_2");
        assert_eq!(heading(3, "a")["type"], "heading_3");
        assert_eq!(heading(9, "a")["type"], "heading_3");
    }

    #[test]
    fn toggle_only_nests_non_empty_children() {
        assert!(toggle("t", Vec::new())["toggle"].get("children").is_none());
        let nested = toggle("t", vec![to_do("inner", true)]);
        assert_eq!(nested["toggle"]["children"][0]["to_do"]["checked"], true);
    }

    #[test]
    fn code_and_callout_defaults() {
        assert_eq!(code("x", None)["code"]["language"], DEFAULT_CODE_LANGUAGE);
        assert_eq!(code("x", Some("rust"))["code"]["language"], "rust");
        assert_eq!(
            callout("note", None)["callout"]["icon"],
            json!({ "type": "emoji", "emoji": DEFAULT_CALLOUT_EMOJI })
        );
    }
}
