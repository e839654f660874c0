//! Energy advisor logic that does not need a language model: home
//! statistics and the check for unusually high consumption. The model is
//! only asked to explain consumption once it has been found unusual.

use crate::error::{Error, Result};
use crate::integrations::{EnergyAdvisor, UnusualExplanation};
use crate::models::{AutomationRule, Device, RuleLog};
use crate::services::round_to;
use crate::store::HomeState;
use serde::Serialize;

/// Consumption above this multiple of the usual level is unusual.
pub const UNUSUAL_RATIO: f64 = 1.3;

const NORMAL_MESSAGE: &str = "Energy consumption is within normal range.";
const FALLBACK_MESSAGE: &str = "Energy consumption is unusually high.";
const FALLBACK_SUGGESTIONS: [&str; 2] = [
    "Check for devices left on",
    "Review AC temperature settings",
];

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionAnalysis {
    pub is_unusual: bool,
    pub current_usage: f64,
    pub historical_average: f64,
    pub increase_percentage: f64,
    pub message: String,
    pub suggestions: Vec<String>,
}

/// Counts over the current state of the home
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnergyInsights {
    pub total_devices: usize,
    pub active_devices: usize,
    pub total_rules: usize,
    pub active_rules: usize,
    pub rule_executions: usize,
    pub failed_executions: usize,
    pub presence: bool,
    pub electricity_price: f64,
}

pub fn energy_insights(
    devices: &[Device],
    rules: &[AutomationRule],
    logs: &[RuleLog],
    home: &HomeState,
) -> EnergyInsights {
    EnergyInsights {
        total_devices: devices.len(),
        active_devices: devices.iter().filter(|d| d.status).count(),
        total_rules: rules.len(),
        active_rules: rules.iter().filter(|r| r.enabled).count(),
        rule_executions: logs.len(),
        failed_executions: logs.iter().filter(|l| !l.success).count(),
        presence: home.presence,
        electricity_price: home.electricity_price,
    }
}

pub fn is_unusual(current_kwh: f64, average_kwh: f64) -> bool {
    current_kwh > average_kwh * UNUSUAL_RATIO
}

/// Compare current consumption with the usual level. Unusual consumption is
/// explained by `advisor`, or by a fixed checklist when the advisor fails.
pub async fn analyze_consumption(
    advisor: &dyn EnergyAdvisor,
    current_kwh: f64,
    average_kwh: f64,
    devices: &[Device],
) -> Result<ConsumptionAnalysis> {
    ensure_positive("currentUsage", current_kwh)?;
    ensure_positive("historicalAverage", average_kwh)?;

    let increase_percentage = round_to((current_kwh / average_kwh - 1.0) * 100.0, 1);
    let analysis = |is_unusual, explanation: UnusualExplanation| ConsumptionAnalysis {
        is_unusual,
        current_usage: current_kwh,
        historical_average: average_kwh,
        increase_percentage,
        message: explanation.message,
        suggestions: explanation.suggestions,
    };

    if !is_unusual(current_kwh, average_kwh) {
        return Ok(analysis(
            false,
            UnusualExplanation {
                message: NORMAL_MESSAGE.to_string(),
                suggestions: Vec::new(),
            },
        ));
    }

    let active: Vec<Device> = devices.iter().filter(|d| d.status).cloned().collect();
    let explanation = match advisor.explain_unusual(current_kwh, average_kwh, &active).await {
        Ok(explanation) => explanation,
        Err(e) => {
            log::warn!("Advisor could not explain unusual consumption: {}", e);
            UnusualExplanation {
                message: FALLBACK_MESSAGE.to_string(),
                suggestions: FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            }
        }
    };

    Ok(analysis(true, explanation))
}

fn ensure_positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidUsageValue { field, value })
    }
}
