//! `condition` step: a one-way gate over a single comparison.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StepOutcome;
use crate::context::ExecutionContext;
use crate::template::stringify;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    /// Loose equality.
    Equals,
    /// Loose inequality.
    NotEquals,
    /// Numeric greater than.
    Gt,
    /// Numeric less than.
    Lt,
    /// Substring containment after string coercion.
    Contains,
    /// Operand is present and not null.
    Exists,
    /// Anything else; always evaluates to false.
    #[serde(other)]
    Unsupported,
}

/// What to do when the comparison is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FalseAction {
    /// Halt the execution with status `stopped`.
    Stop,
    #[default]
    #[serde(other)]
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionStep {
    /// Context path of the operand, bare (`age`) or wrapped (`{{age}}`).
    pub field: String,

    pub operator: Operator,

    /// Comparison target (templated).
    #[serde(default)]
    pub value: Value,

    #[serde(default)]
    pub action_if_false: FalseAction,
}

impl ConditionStep {
    /// Evaluate the comparison against the current context.
    ///
    /// The operand is looked up, not template-resolved: a missing field is
    /// undefined, so `exists` is false and `equals null` is true.
    pub fn evaluate(&self, ctx: &ExecutionContext) -> bool {
        let operand = ctx.lookup(field_path(&self.field));
        let target = ctx.resolve(&self.value);

        match self.operator {
            Operator::Equals => loose_eq(operand, &target),
            Operator::NotEquals => !loose_eq(operand, &target),
            Operator::Gt => to_number(operand) > to_number(Some(&target)),
            Operator::Lt => to_number(operand) < to_number(Some(&target)),
            Operator::Contains => match operand {
                Some(v) => stringify(v).contains(&stringify(&target)),
                None => false,
            },
            Operator::Exists => !matches!(operand, None | Some(Value::Null)),
            Operator::Unsupported => false,
        }
    }

    /// Map the comparison result to the executor's next move.
    pub fn outcome(&self, ctx: &ExecutionContext) -> StepOutcome {
        let passed = self.evaluate(ctx);
        tracing::debug!(
            field = %self.field,
            operator = ?self.operator,
            passed,
            "Evaluated condition"
        );

        if !passed && self.action_if_false == FalseAction::Stop {
            StepOutcome::Stop
        } else {
            StepOutcome::Continue
        }
    }
}

fn field_path(field: &str) -> &str {
    let trimmed = field.trim();
    trimmed
        .strip_prefix("{{")
        .and_then(|s| s.strip_suffix("}}"))
        .unwrap_or(trimmed)
        .trim()
}

/// Loose equality: null and missing are equal to each other only, numbers
/// compare against numeric strings, booleans compare as 0/1. Arrays and
/// objects facing a primitive are flattened to their primitive text first.
fn loose_eq(operand: Option<&Value>, target: &Value) -> bool {
    let Some(operand) = operand else {
        return target.is_null();
    };

    match (operand, target) {
        (Value::Null, t) => t.is_null(),
        (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(_), Value::Number(_)) => to_number(Some(operand)) == to_number(Some(target)),
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(_) | Value::String(_) | Value::Bool(_), Value::Number(_) | Value::String(_) | Value::Bool(_)) => {
            to_number(Some(operand)) == to_number(Some(target))
        }
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => operand == target,
        (compound @ (Value::Array(_) | Value::Object(_)), primitive) => {
            loose_eq(Some(&Value::String(to_primitive(compound))), primitive)
        }
        (primitive, compound) => loose_eq(Some(primitive), &Value::String(to_primitive(compound))),
    }
}

/// Primitive text of a value: arrays join their items with `,`, null items
/// become empty and objects become `[object Object]`.
fn to_primitive(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(to_primitive).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => stringify(other),
    }
}

/// Numeric cast. Missing values and unparsable text become NaN.
fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_number(s),
        Some(array @ Value::Array(_)) => parse_number(&to_primitive(array)),
        Some(Value::Object(_)) => f64::NAN,
    }
}

fn parse_number(s: &str) -> f64 {
    let t = s.trim();
    match t {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => t.parse().unwrap_or(f64::NAN),
    }
}
