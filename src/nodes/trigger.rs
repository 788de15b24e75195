/// Run-starting nodes: manual trigger and interval schedule
///
/// Both simply pass their incoming value downstream. The schedule node's data
/// also configures the controller's repeat loop.

use crate::error::ValidationError;
use crate::nodes::{patch, HandlerOutcome, NodeHandler};
use crate::workflow::types::{NodeData, NodeKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Manual run start
pub struct TriggerHandler;

#[async_trait]
impl NodeHandler for TriggerHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Trigger
    }

    fn default_data(&self) -> NodeData {
        NodeData::new()
    }

    async fn execute(&self, _data: &NodeData, incoming: Option<&Value>) -> HandlerOutcome {
        HandlerOutcome::pass(incoming.cloned())
    }
}

/// Interval run start
pub struct ScheduleHandler;

#[async_trait]
impl NodeHandler for ScheduleHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Schedule
    }

    fn default_data(&self) -> NodeData {
        patch([
            // display only, never parsed
            ("cron", json!("0 8 * * *")),
            ("delaySeconds", json!(0)),
            ("repeatIntervalValue", json!(1)),
            ("repeatIntervalUnit", json!("seconds")),
            ("repeatCount", json!(1)),
        ])
    }

    async fn execute(&self, _data: &NodeData, incoming: Option<&Value>) -> HandlerOutcome {
        HandlerOutcome::pass(incoming.cloned())
    }
}

/// Unit of a schedule's repeat interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Seconds,
    Minutes,
    Hours,
}

impl IntervalUnit {
    pub fn millis(self) -> u64 {
        match self {
            IntervalUnit::Seconds => 1_000,
            IntervalUnit::Minutes => 60_000,
            IntervalUnit::Hours => 3_600_000,
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "seconds" => Some(IntervalUnit::Seconds),
            "minutes" => Some(IntervalUnit::Minutes),
            "hours" => Some(IntervalUnit::Hours),
            _ => None,
        }
    }
}

/// Interval length in milliseconds for `value` units
pub fn interval_ms(value: f64, unit: IntervalUnit) -> u64 {
    (value * unit.millis() as f64).round() as u64
}

/// Longest interval or start delay a schedule accepts
pub const MAX_SCHEDULE_SPAN: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Validated loop settings read from a schedule node's data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleSettings {
    pub interval: Duration,
    pub delay: Duration,
    /// Number of runs before the loop stops itself, 0 = until stopped
    pub repeat_count: u64,
}

impl ScheduleSettings {
    pub fn from_data(node_id: &str, data: &NodeData) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidInterval {
            node_id: node_id.to_string(),
            reason: reason.to_string(),
        };

        let value = data
            .get("repeatIntervalValue")
            .filter(|value| !value.is_null())
            .ok_or_else(|| ValidationError::MissingData {
                node_id: node_id.to_string(),
                field: "repeatIntervalValue".to_string(),
            })?
            .as_f64()
            .filter(|value| value.is_finite() && *value > 0.0)
            .ok_or_else(|| invalid("repeatIntervalValue must be a positive number"))?;

        let unit_text = data
            .get("repeatIntervalUnit")
            .and_then(Value::as_str)
            .filter(|unit| !unit.trim().is_empty())
            .ok_or_else(|| ValidationError::MissingData {
                node_id: node_id.to_string(),
                field: "repeatIntervalUnit".to_string(),
            })?;
        let unit = IntervalUnit::parse(unit_text)
            .ok_or_else(|| invalid("repeatIntervalUnit must be seconds, minutes or hours"))?;

        let millis = interval_ms(value, unit);
        if millis == 0 {
            return Err(invalid("interval rounds down to zero milliseconds"));
        }
        let interval = Duration::from_millis(millis);
        if interval > MAX_SCHEDULE_SPAN {
            return Err(invalid("interval must be at most one year"));
        }

        let delay_seconds = data
            .get("delaySeconds")
            .and_then(Value::as_f64)
            .filter(|delay| delay.is_finite() && *delay > 0.0)
            .unwrap_or(0.0);
        let delay = Duration::try_from_secs_f64(delay_seconds)
            .ok()
            .filter(|delay| *delay <= MAX_SCHEDULE_SPAN)
            .ok_or_else(|| invalid("delaySeconds must be at most one year"))?;

        let repeat_count = data
            .get("repeatCount")
            .and_then(Value::as_f64)
            .filter(|count| count.is_finite() && *count > 0.0)
            .map(|count| count as u64)
            .unwrap_or(0);

        Ok(Self {
            interval,
            delay,
            repeat_count,
        })
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_conversion() {
        assert_eq!(interval_ms(5.0, IntervalUnit::Minutes), 300_000);
        assert_eq!(interval_ms(2.0, IntervalUnit::Hours), 7_200_000);
        assert_eq!(interval_ms(10.0, IntervalUnit::Seconds), 10_000);
        assert_eq!(interval_ms(0.5, IntervalUnit::Seconds), 500);
    }

    #[test]
    fn reads_default_schedule_data() {
        let settings = ScheduleSettings::from_data("s", &ScheduleHandler.default_data()).unwrap();
        assert_eq!(settings.interval_ms(), 1_000);
        assert_eq!(settings.delay, Duration::ZERO);
        assert_eq!(settings.repeat_count, 1);
    }

    #[test]
    fn rejects_bad_intervals() {
        let data = patch([("repeatIntervalValue", json!(0)), ("repeatIntervalUnit", json!("seconds"))]);
        assert!(matches!(
            ScheduleSettings::from_data("s", &data),
            Err(ValidationError::InvalidInterval { .. })
        ));

        let data = patch([("repeatIntervalValue", json!("5")), ("repeatIntervalUnit", json!("minutes"))]);
        assert!(matches!(
            ScheduleSettings::from_data("s", &data),
            Err(ValidationError::InvalidInterval { .. })
        ));

        let data = patch([("repeatIntervalValue", json!(5))]);
        assert_eq!(
            ScheduleSettings::from_data("s", &data),
            Err(ValidationError::MissingData {
                node_id: "s".into(),
                field: "repeatIntervalUnit".into()
            })
        );

        let data = patch([("repeatIntervalValue", json!(5)), ("repeatIntervalUnit", json!("days"))]);
        assert!(ScheduleSettings::from_data("s", &data).is_err());

        let data = patch([("repeatIntervalValue", json!(1e12)), ("repeatIntervalUnit", json!("hours"))]);
        assert!(matches!(
            ScheduleSettings::from_data("s", &data),
            Err(ValidationError::InvalidInterval { .. })
        ));

        let data = patch([
            ("delaySeconds", json!(1e20)),
            ("repeatIntervalValue", json!(1)),
            ("repeatIntervalUnit", json!("seconds")),
        ]);
        assert!(matches!(
            ScheduleSettings::from_data("s", &data),
            Err(ValidationError::InvalidInterval { reason, .. }) if reason.contains("delaySeconds")
        ));
    }

    #[test]
    fn zero_repeat_count_means_forever() {
        let data = patch([
            ("repeatIntervalValue", json!(2)),
            ("repeatIntervalUnit", json!("minutes")),
            ("repeatCount", json!(0)),
            ("delaySeconds", json!(3)),
        ]);
        let settings = ScheduleSettings::from_data("s", &data).unwrap();
        assert_eq!(settings.repeat_count, 0);
        assert_eq!(settings.delay, Duration::from_secs(3));
        assert_eq!(settings.interval_ms(), 120_000);
    }

    #[tokio::test]
    async fn passes_incoming_value() {
        let outcome = TriggerHandler.execute(&NodeData::new(), Some(&json!(3))).await;
        assert_eq!(outcome, HandlerOutcome::pass(Some(json!(3))));
        let outcome = ScheduleHandler.execute(&NodeData::new(), None).await;
        assert_eq!(outcome.value, None);
        assert!(outcome.branch_handle.is_none());
    }
}
