//! Filter and sort evaluation for locally held documents.
//!
//! Supports the subset of the Payload `where` syntax the engine relies on:
//! `equals`, `not_equals`, `greater_than`, `greater_than_equal`, `less_than`,
//! `less_than_equal`, `in`, `not_in`, `exists`, `contains`, plus nested
//! `and` / `or` arrays. A bare value is shorthand for `equals`.

use serde_json::Value;
use std::cmp::Ordering;

use crate::error::StoreError;
use crate::template;

/// Check whether `doc` satisfies the `filter` clause.
pub fn matches(doc: &Value, filter: &Value) -> Result<bool, StoreError> {
    match filter {
        Value::Null => Ok(true),
        Value::Object(clauses) => {
            for (field, condition) in clauses {
                let ok = match field.as_str() {
                    "and" => {
                        let mut all = true;
                        for sub in as_clause_list(field, condition)? {
                            if !matches(doc, sub)? {
                                all = false;
                                break;
                            }
                        }
                        all
                    }
                    "or" => {
                        let mut any = false;
                        for sub in as_clause_list(field, condition)? {
                            if matches(doc, sub)? {
                                any = true;
                                break;
                            }
                        }
                        any
                    }
                    path => field_matches(field_value(doc, path), condition)?,
                };

                if !ok {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => Err(StoreError::Rejected(format!(
            "where clause must be an object, got {}",
            other
        ))),
    }
}

/// Stable sort by a `field` / `-field` key list. Ties keep their order.
pub fn sort_documents(docs: &mut [Value], sort: &str) {
    let keys: Vec<(&str, bool)> = sort
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| match k.strip_prefix('-') {
            Some(field) => (field, true),
            None => (k, false),
        })
        .collect();

    if keys.is_empty() {
        return;
    }

    docs.sort_by(|a, b| {
        for (field, descending) in &keys {
            let ord = compare_sort_values(field_value(a, field), field_value(b, field));
            let ord = if *descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn as_clause_list<'a>(field: &str, value: &'a Value) -> Result<&'a Vec<Value>, StoreError> {
    value
        .as_array()
        .ok_or_else(|| StoreError::Rejected(format!("'{}' expects an array of clauses", field)))
}

fn field_value<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    doc.as_object().and_then(|obj| template::lookup(obj, path))
}

fn field_matches(value: Option<&Value>, condition: &Value) -> Result<bool, StoreError> {
    match condition {
        Value::Object(ops) => {
            for (op, operand) in ops {
                if !apply_operator(op, value, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => apply_operator("equals", value, other),
    }
}

fn apply_operator(op: &str, value: Option<&Value>, operand: &Value) -> Result<bool, StoreError> {
    let result = match op {
        "equals" => equals(value, operand),
        "not_equals" => !equals(value, operand),
        "greater_than" => compare(value, operand) == Some(Ordering::Greater),
        "greater_than_equal" => matches!(
            compare(value, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        "less_than" => compare(value, operand) == Some(Ordering::Less),
        "less_than_equal" => {
            matches!(compare(value, operand), Some(Ordering::Less | Ordering::Equal))
        }
        "in" => operand
            .as_array()
            .map(|items| items.iter().any(|item| equals(value, item)))
            .unwrap_or(false),
        "not_in" => operand
            .as_array()
            .map(|items| !items.iter().any(|item| equals(value, item)))
            .unwrap_or(true),
        "exists" => {
            let present = value.is_some_and(|v| !v.is_null());
            present == truthy(operand)
        }
        "contains" => contains(value, operand),
        other => {
            return Err(StoreError::Rejected(format!(
                "Unsupported where operator: {}",
                other
            )))
        }
    };

    Ok(result)
}

fn equals(value: Option<&Value>, operand: &Value) -> bool {
    match (value, operand) {
        (None, Value::Null) => true,
        (None, _) => false,
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Some(Value::Number(a)), Value::String(b)) | (Some(Value::String(b)), Value::Number(a)) => {
            b.trim().parse::<f64>().ok() == a.as_f64()
        }
        (Some(Value::Bool(a)), Value::String(b)) => b.as_str() == if *a { "true" } else { "false" },
        (Some(v), other) => v == other,
    }
}

fn compare(value: Option<&Value>, operand: &Value) -> Option<Ordering> {
    match (value?, operand) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (a, b) => number(a)?.partial_cmp(&number(b)?),
    }
}

fn contains(value: Option<&Value>, operand: &Value) -> bool {
    match value {
        Some(Value::String(s)) => {
            let needle = template::stringify(operand).to_lowercase();
            s.to_lowercase().contains(&needle)
        }
        Some(Value::Array(items)) => items.iter().any(|item| equals(Some(item), operand)),
        _ => false,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s != "false" && !s.is_empty(),
        Value::Null => false,
        _ => true,
    }
}

/// Total order used for sorting: missing/null < bool < number < string < other.
fn compare_sort_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equals_and_shorthand() {
        let doc = json!({"event": "form.submit", "active": true, "priority": 5});
        assert!(matches(&doc, &json!({"event": {"equals": "form.submit"}})).unwrap());
        assert!(matches(&doc, &json!({"event": "form.submit", "active": true})).unwrap());
        assert!(!matches(&doc, &json!({"active": {"equals": false}})).unwrap());
        assert!(matches(&doc, &json!({"priority": {"equals": "5"}})).unwrap());
    }

    #[test]
    fn test_null_filter_matches_everything() {
        assert!(matches(&json!({"any": 1}), &Value::Null).unwrap());
    }

    #[test]
    fn test_comparisons() {
        let doc = json!({"priority": 5, "name": "beta"});
        assert!(matches(&doc, &json!({"priority": {"greater_than": 4}})).unwrap());
        assert!(!matches(&doc, &json!({"priority": {"less_than": 5}})).unwrap());
        assert!(matches(&doc, &json!({"priority": {"less_than_equal": 5}})).unwrap());
        assert!(matches(&doc, &json!({"name": {"greater_than": "alpha"}})).unwrap());
    }

    #[test]
    fn test_in_exists_contains() {
        let doc = json!({"status": "active", "tags": ["a", "b"], "title": "Hello World"});
        assert!(matches(&doc, &json!({"status": {"in": ["draft", "active"]}})).unwrap());
        assert!(matches(&doc, &json!({"status": {"not_in": ["archived"]}})).unwrap());
        assert!(matches(&doc, &json!({"missing": {"exists": false}})).unwrap());
        assert!(matches(&doc, &json!({"status": {"exists": true}})).unwrap());
        assert!(matches(&doc, &json!({"title": {"contains": "world"}})).unwrap());
        assert!(matches(&doc, &json!({"tags": {"contains": "b"}})).unwrap());
    }

    #[test]
    fn test_and_or_and_dotted_paths() {
        let doc = json!({"customer": {"tier": "gold"}, "total": 120});
        let filter = json!({
            "or": [
                {"customer.tier": {"equals": "platinum"}},
                {"and": [
                    {"customer.tier": {"equals": "gold"}},
                    {"total": {"greater_than": 100}}
                ]}
            ]
        });
        assert!(matches(&doc, &filter).unwrap());
    }

    #[test]
    fn test_unsupported_operator_is_rejected() {
        let err = matches(&json!({"a": 1}), &json!({"a": {"near": "1,2"}})).unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[test]
    fn test_sort_descending_is_stable() {
        let mut docs = vec![
            json!({"id": "low", "priority": 1}),
            json!({"id": "tie-a", "priority": 5}),
            json!({"id": "none"}),
            json!({"id": "tie-b", "priority": 5}),
        ];
        sort_documents(&mut docs, "-priority");

        let ids: Vec<_> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["tie-a", "tie-b", "low", "none"]);
    }

    #[test]
    fn test_sort_multiple_keys() {
        let mut docs = vec![
            json!({"id": "1", "group": "b", "n": 2}),
            json!({"id": "2", "group": "a", "n": 1}),
            json!({"id": "3", "group": "b", "n": 1}),
        ];
        sort_documents(&mut docs, "group,-n");

        let ids: Vec<_> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
    }
}
