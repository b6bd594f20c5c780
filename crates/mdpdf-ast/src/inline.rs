//! Inline content helpers.
//!
//! Inlines stay as raw JSON; these helpers build the few shapes the filter
//! emits and find images inside arbitrary content.

use serde_json::{Value, json};

/// A Pandoc inline, as JSON.
pub type Inline = Value;

/// Split text into `Str`/`Space` inlines the way Pandoc tokenizes prose.
#[must_use]
pub fn text(s: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    for (i, word) in s.split_whitespace().enumerate() {
        if i > 0 {
            out.push(space());
        }
        out.push(str(word));
    }
    out
}

#[must_use]
pub fn str(s: &str) -> Inline {
    json!({"t": "Str", "c": s})
}

#[must_use]
pub fn space() -> Inline {
    json!({"t": "Space"})
}

#[must_use]
pub fn strong(content: Vec<Inline>) -> Inline {
    json!({"t": "Strong", "c": content})
}

#[must_use]
pub fn code(s: &str) -> Inline {
    json!({"t": "Code", "c": [["", [], []], s]})
}

/// Image inline with alt text and target URL.
#[must_use]
pub fn image(url: &str, alt: &str) -> Inline {
    json!({"t": "Image", "c": [["", [], []], text(alt), [url, ""]]})
}

/// Rewrite the target URL of every `Image` found inside `value`.
///
/// The callback returns the new URL, or `None` to keep the old one.
pub fn rewrite_image_urls(value: &mut Value, f: &mut dyn FnMut(&str) -> Option<String>) {
    match value {
        Value::Object(obj) => {
            if obj.get("t").and_then(Value::as_str) == Some("Image")
                && let Some(url) = obj
                    .get_mut("c")
                    .and_then(|c| c.get_mut(2))
                    .and_then(|target| target.get_mut(0))
                && let Some(new_url) = url.as_str().and_then(&mut *f)
            {
                *url = Value::String(new_url);
            }
            for child in obj.values_mut() {
                rewrite_image_urls(child, f);
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_image_urls(item, f);
            }
        }
        _ => {}
    }
}

/// Concatenated plain text of a list of inlines.
#[must_use]
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        collect_text(inline, &mut out);
    }
    out
}

fn collect_text(value: &Value, out: &mut String) {
    match value.get("t").and_then(Value::as_str) {
        Some("Str") => {
            if let Some(s) = value.get("c").and_then(Value::as_str) {
                out.push_str(s);
            }
        }
        Some("Space" | "SoftBreak" | "LineBreak") => out.push(' '),
        Some("Code") => {
            if let Some(s) = value.get("c").and_then(|c| c.get(1)).and_then(Value::as_str) {
                out.push_str(s);
            }
        }
        _ => match value.get("c") {
            Some(Value::Array(items)) => {
                for item in items {
                    collect_text(item, out);
                }
            }
            Some(other @ Value::Object(_)) => collect_text(other, out),
            _ => {}
        },
    }
}
