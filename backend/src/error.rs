use thiserror::Error;

/// Errors raised by the rule engine, the plan scorer and the registries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Unsupported condition type: {0}")]
    UnsupportedConditionType(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid condition value: {0}")]
    InvalidConditionValue(String),

    #[error("Unknown device in condition: {0}")]
    UnknownDevice(String),

    #[error("Plan not found: {0}")]
    PlanNotFound(i32),

    #[error("Invalid {field}: {value} (must be a finite, positive number)")]
    InvalidUsageValue { field: &'static str, value: f64 },

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device with id '{0}' already exists")]
    DeviceExists(String),

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[error("Rule not found: {0}")]
    RuleNotFound(i32),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Message is required")]
    EmptyMessage,
}

pub type Result<T> = std::result::Result<T, Error>;
