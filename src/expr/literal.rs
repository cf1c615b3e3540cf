//! Rendering values back into expression source.

use serde_json::Value;

/// Source text that evaluates back to `value`.
pub fn to_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => match n.as_f64() {
            // `{:?}` keeps the decimal point (`49.0`), so floats stay floats.
            Some(f) if n.is_f64() => format!("{:?}", f),
            _ => n.to_string(),
        },
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(to_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), to_literal(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Human form used by `str()`: strings unquoted, everything else literal.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => to_literal(other),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literals() {
        assert_eq!(to_literal(&json!(49.0)), "49.0");
        assert_eq!(to_literal(&json!(2)), "2");
        assert_eq!(to_literal(&json!("it's")), r"'it\'s'");
        assert_eq!(to_literal(&json!([1, null, true])), "[1, None, True]");
        assert_eq!(to_literal(&json!({"a": "b"})), "{'a': 'b'}");
    }

    #[test]
    fn display_leaves_strings_bare() {
        assert_eq!(display(&json!("hi")), "hi");
        assert_eq!(display(&json!(1.5)), "1.5");
    }
}
