//! Condition evaluation for automation rules.
//!
//! A stored [`ConditionSpec`] is parsed into a typed [`Condition`] and checked
//! against a [`StateSnapshot`] of the home. Evaluation is a pure function of
//! those two inputs: no I/O, no shared state.

use crate::error::{Error, Result};
use crate::models::ConditionSpec;
use chrono::{NaiveTime, Timelike};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

const SECONDS_PER_DAY: i64 = 24 * 3600;

/// Smallest window a time condition is matched in.
pub const MIN_TIME_WINDOW: Duration = Duration::from_secs(60);

/// Largest window. A window of a whole day would match at every instant.
pub const MAX_TIME_WINDOW: Duration = Duration::from_secs(SECONDS_PER_DAY as u64 - 1);

/// Window a time condition holds in when the engine polls every `poll_interval`.
pub fn time_window(poll_interval: Duration) -> Duration {
    poll_interval.clamp(MIN_TIME_WINDOW, MAX_TIME_WINDOW)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Gt,
    Lt,
    Eq,
    Ge,
    Le,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Eq => "=",
            Operator::Ge => ">=",
            Operator::Le => "<=",
        }
    }

    pub fn compare<T: PartialOrd>(&self, lhs: T, rhs: T) -> bool {
        match self {
            Operator::Gt => lhs > rhs,
            Operator::Lt => lhs < rhs,
            Operator::Eq => lhs == rhs,
            Operator::Ge => lhs >= rhs,
            Operator::Le => lhs <= rhs,
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            "=" => Ok(Operator::Eq),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            other => Err(Error::UnsupportedOperator(other.to_string())),
        }
    }
}

/// What a `device_state` condition compares against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceTarget {
    Status(bool),
    Value(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Time {
        at: NaiveTime,
    },
    Temperature {
        operator: Operator,
        threshold: f64,
    },
    Humidity {
        operator: Operator,
        threshold: f64,
    },
    Price {
        operator: Operator,
        threshold: f64,
    },
    Presence {
        expected: bool,
    },
    DeviceState {
        device_id: String,
        operator: Operator,
        target: DeviceTarget,
    },
}

/// State of one device as seen by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceSnapshot {
    pub status: bool,
    pub value: Option<f64>,
}

/// Everything a condition may look at, captured once per automation tick.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub time: NaiveTime,
    /// Width of the window a `time` condition matches in; the poll interval.
    pub window: Duration,
    pub temperature: f64,
    pub humidity: f64,
    pub presence: bool,
    pub price: f64,
    pub device_states: HashMap<String, DeviceSnapshot>,
}

impl TryFrom<&ConditionSpec> for Condition {
    type Error = Error;

    fn try_from(spec: &ConditionSpec) -> Result<Self> {
        match spec.kind.as_str() {
            "time" => {
                let at = time_value(&spec.value)?;
                Ok(Condition::Time { at })
            }
            "temperature" => Ok(Condition::Temperature {
                operator: operator_of(spec)?,
                threshold: numeric_value(&spec.value)?,
            }),
            "humidity" => Ok(Condition::Humidity {
                operator: operator_of(spec)?,
                threshold: numeric_value(&spec.value)?,
            }),
            "price" => Ok(Condition::Price {
                operator: operator_of(spec)?,
                threshold: numeric_value(&spec.value)?,
            }),
            "presence" => Ok(Condition::Presence {
                expected: bool_value(&spec.value).ok_or_else(|| {
                    Error::InvalidConditionValue(format!(
                        "presence expects true or false, got {}",
                        spec.value
                    ))
                })?,
            }),
            "device_state" => {
                let device_id = spec
                    .device_id
                    .clone()
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        Error::InvalidConditionValue(
                            "device_state requires a deviceId".to_string(),
                        )
                    })?;
                Ok(Condition::DeviceState {
                    device_id,
                    operator: operator_of(spec)?,
                    target: device_target(&spec.value)?,
                })
            }
            other => Err(Error::UnsupportedConditionType(other.to_string())),
        }
    }
}

impl Condition {
    pub fn holds(&self, snapshot: &StateSnapshot) -> Result<bool> {
        let holds = match self {
            Condition::Time { at } => within_window(*at, snapshot.time, snapshot.window),
            Condition::Temperature {
                operator,
                threshold,
            } => operator.compare(snapshot.temperature, *threshold),
            Condition::Humidity {
                operator,
                threshold,
            } => operator.compare(snapshot.humidity, *threshold),
            Condition::Price {
                operator,
                threshold,
            } => operator.compare(snapshot.price, *threshold),
            Condition::Presence { expected } => snapshot.presence == *expected,
            Condition::DeviceState {
                device_id,
                operator,
                target,
            } => {
                let device = snapshot
                    .device_states
                    .get(device_id)
                    .ok_or_else(|| Error::UnknownDevice(device_id.clone()))?;
                match target {
                    DeviceTarget::Status(expected) => operator.compare(device.status, *expected),
                    // A device without a numeric setting never satisfies a value comparison
                    DeviceTarget::Value(expected) => device
                        .value
                        .is_some_and(|value| operator.compare(value, *expected)),
                }
            }
        };
        Ok(holds)
    }
}

/// Decide whether a rule condition holds for the given snapshot.
pub fn evaluate_condition(spec: &ConditionSpec, snapshot: &StateSnapshot) -> Result<bool> {
    Condition::try_from(spec)?.holds(snapshot)
}

fn operator_of(spec: &ConditionSpec) -> Result<Operator> {
    match spec.operator.as_deref() {
        Some(op) => op.parse(),
        None => Ok(Operator::Eq),
    }
}

fn numeric_value(value: &JsonValue) -> Result<f64> {
    let parsed = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::InvalidConditionValue(format!("expected a number, got {}", value)))
}

fn bool_value(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn time_value(value: &JsonValue) -> Result<NaiveTime> {
    value
        .as_str()
        .and_then(|s| NaiveTime::parse_from_str(s.trim(), "%H:%M").ok())
        .ok_or_else(|| {
            Error::InvalidConditionValue(format!("expected a time as HH:MM, got {}", value))
        })
}

fn device_target(value: &JsonValue) -> Result<DeviceTarget> {
    if let Some(status) = bool_value(value) {
        return Ok(DeviceTarget::Status(status));
    }
    numeric_value(value).map(DeviceTarget::Value).map_err(|_| {
        Error::InvalidConditionValue(format!(
            "device_state expects a boolean or a number, got {}",
            value
        ))
    })
}

/// True when `now` falls in `[at, at + window)`, wrapping past midnight.
fn within_window(at: NaiveTime, now: NaiveTime, window: Duration) -> bool {
    let window = time_window(window).as_secs() as i64;
    let elapsed = (now.num_seconds_from_midnight() as i64
        - at.num_seconds_from_midnight() as i64)
        .rem_euclid(SECONDS_PER_DAY);
    elapsed < window
}
