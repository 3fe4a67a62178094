//! `{{path}}` token resolution.

use regex::{Captures, Regex};
use serde_json::{Map, Number, Value};
use std::sync::LazyLock;

/// Matches one token; the first `}}` after `{{` closes it.
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("token pattern is valid"));

/// Resolve every token inside `value` against `context`.
///
/// - A string that is exactly one token yields the referenced value as-is
///   (objects, arrays and numbers keep their type).
/// - Tokens embedded in a longer string are replaced by the stringified value.
/// - Tokens whose path does not resolve are left verbatim.
/// - Arrays and objects are resolved element-wise; keys are never rewritten.
/// - Numbers, booleans and null pass through unchanged.
pub fn resolve(value: &Value, context: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => resolve_str(s, context),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, context)).collect()),
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), resolve(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Resolve a string and coerce the result back to a string.
///
/// Used for fields that must be text (urls, collection names, record ids).
pub fn resolve_string(s: &str, context: &Map<String, Value>) -> String {
    stringify(&resolve_str(s, context))
}

/// Walk a dotted path through the context.
///
/// Objects are indexed by key and arrays by numeric segment. Any miss
/// returns `None`; nothing here panics on malformed paths.
pub fn lookup<'a>(context: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Object(obj) => obj.get(segment)?,
            Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Coerce a JSON value to the text substituted into embedded tokens.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn resolve_str(s: &str, context: &Map<String, Value>) -> Value {
    let Some(caps) = TOKEN.captures(s) else {
        return Value::String(s.to_string());
    };

    let whole = caps.get(0).map(|m| m.start() == 0 && m.end() == s.len()).unwrap_or(false);
    if whole {
        return lookup(context, caps[1].trim())
            .cloned()
            .unwrap_or_else(|| Value::String(s.to_string()));
    }

    let rendered = TOKEN.replace_all(s, |caps: &Captures| {
        match lookup(context, caps[1].trim()) {
            Some(v) => stringify(v),
            None => caps[0].to_string(),
        }
    });

    Value::String(rendered.into_owned())
}

/// Integral floats render without a trailing `.0` (`42.0` -> `42`).
fn format_number(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                return format!("{}", f as i64);
            }
        }
    }
    n.to_string()
}
