//! `{{path}}` substitution for prompt bodies and plan step text.
//!
//! A placeholder is replaced with the context value at `path`: strings as-is,
//! other values as compact JSON. Placeholders whose path is malformed, absent
//! or null are left verbatim and reported, never filled with a guess.

use packwarden_schema::FieldPath;
use serde_json::Value;

/// The result of rendering one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Placeholder paths left in `text`, in order of first appearance.
    pub unresolved: Vec<String>,
}

pub fn render(template: &str, context: &Value) -> Rendered {
    let mut text = String::with_capacity(template.len());
    let mut unresolved: Vec<String> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };
        text.push_str(&rest[..start]);

        let raw = &rest[start..start + 2 + end + 2];
        let key = after_open[..end].trim();
        match lookup(key, context) {
            Some(value) => text.push_str(&value),
            None => {
                text.push_str(raw);
                if !unresolved.iter().any(|u| u == key) {
                    unresolved.push(key.to_string());
                }
            }
        }
        rest = &after_open[end + 2..];
    }
    text.push_str(rest);

    Rendered { text, unresolved }
}

fn lookup(key: &str, context: &Value) -> Option<String> {
    let path = FieldPath::parse(key).ok()?;
    match path.lookup(context)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_strings_and_values() {
        let ctx = json!({"product": {"name": "Acme", "seats": 12, "tags": ["a"]}});
        let out = render("{{product.name}} has {{ product.seats }} seats {{product.tags}}", &ctx);
        assert_eq!(out.text, "Acme has 12 seats [\"a\"]");
        assert!(out.unresolved.is_empty());
    }

    #[test]
    fn unresolved_placeholders_stay_verbatim() {
        let ctx = json!({"stage": null});
        let out = render("Focus: {{stage}} / {{missing.field}} / {{stage}} / {{a..b}}", &ctx);
        assert_eq!(out.text, "Focus: {{stage}} / {{missing.field}} / {{stage}} / {{a..b}}");
        assert_eq!(out.unresolved, vec!["stage", "missing.field", "a..b"]);
    }

    #[test]
    fn unterminated_braces_are_plain_text() {
        let out = render("open {{ never closed", &json!({}));
        assert_eq!(out.text, "open {{ never closed");
        assert!(out.unresolved.is_empty());
    }

    #[test]
    fn jsonpath_prefix_is_accepted() {
        let out = render("{{$.a}}", &json!({"a": "x"}));
        assert_eq!(out.text, "x");
    }
}
