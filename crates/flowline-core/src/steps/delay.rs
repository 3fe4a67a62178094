//! `delay` step.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Unit for [`DelayStep::duration`]. Unknown units fall back to seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayUnit {
    Minutes,
    Hours,
    Days,
    #[default]
    #[serde(other)]
    Seconds,
}

impl DelayUnit {
    pub fn millis(self) -> f64 {
        match self {
            DelayUnit::Seconds => 1_000.0,
            DelayUnit::Minutes => 60_000.0,
            DelayUnit::Hours => 3_600_000.0,
            DelayUnit::Days => 86_400_000.0,
        }
    }
}

/// Suspend the current execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayStep {
    /// Amount of `unit`s; a number or a numeric string.
    pub duration: Value,

    #[serde(default)]
    pub unit: DelayUnit,
}

impl DelayStep {
    /// Total pause. Anything that is not a positive finite number is zero.
    pub fn pause(&self) -> Duration {
        let amount = match &self.duration {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        };

        let millis = amount * self.unit.millis();
        if !millis.is_finite() || millis <= 0.0 {
            return Duration::ZERO;
        }

        Duration::try_from_secs_f64(millis / 1_000.0).unwrap_or(Duration::MAX)
    }

    /// Sleep on the runtime timer; other tasks keep running.
    pub async fn run(&self) {
        let pause = self.pause();
        tracing::debug!(pause_ms = pause.as_millis() as u64, "Delaying execution");
        tokio::time::sleep(pause).await;
    }
}
