//! Token-Oriented Object Notation
//!
//! A compact, indentation-based rendering of JSON for feeding reports to
//! language models. Uniform arrays of flat objects collapse into a header
//! plus one comma-joined row per element:
//!
//! ```text
//! circuits[2]{number,rating}:
//!   1,32
//!   2,16
//! ```

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

const INDENT: &str = "  ";

/// Render a JSON value as TOON text.
pub fn to_toon(value: &Value) -> String {
    let mut lines = Vec::new();
    match value {
        Value::Object(map) => write_object(map, 0, &mut lines),
        Value::Array(items) => write_array("", items, 0, &mut lines),
        other => lines.push(primitive(other)),
    }
    lines.join("\n")
}

fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn numeric_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid regex"))
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.trim() != s
        || matches!(s, "true" | "false" | "null")
        || numeric_regex().is_match(s)
        || s.chars()
            .any(|c| matches!(c, ',' | ':' | '"' | '[' | ']' | '{' | '}' | '\\') || c.is_control())
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn encode_str(s: &str) -> String {
    if needs_quotes(s) {
        quote(s)
    } else {
        s.to_string()
    }
}

fn primitive(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => encode_str(s),
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn pad(indent: usize) -> String {
    INDENT.repeat(indent)
}

fn write_object(map: &Map<String, Value>, indent: usize, lines: &mut Vec<String>) {
    for (key, value) in map {
        let key = encode_str(key);
        match value {
            Value::Object(inner) => {
                lines.push(format!("{}{}:", pad(indent), key));
                write_object(inner, indent + 1, lines);
            }
            Value::Array(items) => write_array(&key, items, indent, lines),
            other => lines.push(format!("{}{}: {}", pad(indent), key, primitive(other))),
        }
    }
}

/// Field names shared by every element, if the array is uniform and flat.
fn tabular_fields(items: &[Value]) -> Option<Vec<&String>> {
    let Some(Value::Object(first)) = items.first() else {
        return None;
    };
    if first.is_empty() {
        return None;
    }
    let fields: Vec<&String> = first.keys().collect();
    let uniform = items.iter().all(|item| match item {
        Value::Object(m) => {
            m.len() == fields.len()
                && fields
                    .iter()
                    .all(|f| m.get(f.as_str()).map(is_primitive).unwrap_or(false))
        }
        _ => false,
    });
    uniform.then_some(fields)
}

fn write_array(key: &str, items: &[Value], indent: usize, lines: &mut Vec<String>) {
    let n = items.len();
    let prefix = pad(indent);

    if items.iter().all(is_primitive) {
        if n == 0 {
            lines.push(format!("{}{}[0]:", prefix, key));
        } else {
            let row: Vec<String> = items.iter().map(primitive).collect();
            lines.push(format!("{}{}[{}]: {}", prefix, key, n, row.join(",")));
        }
        return;
    }

    if let Some(fields) = tabular_fields(items) {
        let header: Vec<String> = fields.iter().map(|f| encode_str(f)).collect();
        lines.push(format!("{}{}[{}]{{{}}}:", prefix, key, n, header.join(",")));
        for item in items {
            if let Value::Object(m) = item {
                let row: Vec<String> = fields
                    .iter()
                    .map(|f| m.get(f.as_str()).map(primitive).unwrap_or_default())
                    .collect();
                lines.push(format!("{}{}", pad(indent + 1), row.join(",")));
            }
        }
        return;
    }

    lines.push(format!("{}{}[{}]:", prefix, key, n));
    for item in items {
        write_list_item(item, indent + 1, lines);
    }
}

fn write_list_item(item: &Value, indent: usize, lines: &mut Vec<String>) {
    let prefix = pad(indent);
    let mut nested = Vec::new();
    match item {
        Value::Object(m) if m.is_empty() => {
            lines.push(format!("{}-", prefix));
            return;
        }
        Value::Object(m) => write_object(m, indent + 1, &mut nested),
        Value::Array(inner) => write_array("", inner, indent + 1, &mut nested),
        other => {
            lines.push(format!("{}- {}", prefix, primitive(other)));
            return;
        }
    }
    // The first nested line moves up onto the dash.
    if let Some(first) = nested.first_mut() {
        *first = format!("{}- {}", prefix, first.trim_start());
    }
    lines.extend(nested);
}
