//! Electricity plan cost projection and ranking.

use crate::error::{Error, Result};
use crate::models::{ElectricityPlan, PlanComparison, SwitchingSavings};
use crate::services::round_to;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MONTHLY_USAGE_KWH: f64 = 400.0;
/// SP Group regulated tariff.
pub const DEFAULT_CURRENT_RATE: f64 = 0.3242;
/// One-time cost assumed when switching retailer.
pub const SWITCHING_COST: f64 = 50.0;
pub const RECOMMENDATION_COUNT: usize = 5;

const BASE_SCORE: f64 = 50.0;
const MAX_SAVINGS_POINTS: f64 = 30.0;
/// Savings percentage that earns the full savings bonus.
const FULL_SAVINGS_PERCENTAGE: f64 = 20.0;
const MAX_RENEWABLE_POINTS: f64 = 20.0;
const CONTRACT_FIT_POINTS: f64 = 20.0;
const CONTRACT_MISFIT_PENALTY: f64 = 10.0;
const NO_TERMINATION_FEE_POINTS: f64 = 10.0;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanPreferences {
    #[serde(default)]
    pub prefer_renewable: bool,
    #[serde(default)]
    pub max_contract_length: Option<u32>,
    /// Accepted and echoed back; the score already rewards savings.
    #[serde(default)]
    pub prioritize_savings: bool,
}

/// Project costs for every plan and rank them, best recommendation first.
///
/// Equal scores are ordered by ascending rate, then provider and plan name,
/// so the output is deterministic for any catalog order.
pub fn compare_plans(
    plans: &[ElectricityPlan],
    monthly_usage_kwh: f64,
    current_rate: f64,
    preferences: &PlanPreferences,
) -> Result<Vec<PlanComparison>> {
    ensure_positive("monthlyUsage", monthly_usage_kwh)?;
    ensure_positive("currentRate", current_rate)?;

    let mut comparisons: Vec<PlanComparison> = plans
        .iter()
        .map(|plan| compare_plan(plan, monthly_usage_kwh, current_rate, preferences))
        .collect();

    comparisons.sort_by(|a, b| {
        b.recommendation_score
            .cmp(&a.recommendation_score)
            .then_with(|| a.plan.rate_per_kwh.total_cmp(&b.plan.rate_per_kwh))
            .then_with(|| a.plan.provider.cmp(&b.plan.provider))
            .then_with(|| a.plan.plan_name.cmp(&b.plan.plan_name))
    });

    Ok(comparisons)
}

/// The top [`RECOMMENDATION_COUNT`] plans of [`compare_plans`].
pub fn recommend_plans(
    plans: &[ElectricityPlan],
    monthly_usage_kwh: f64,
    current_rate: f64,
    preferences: &PlanPreferences,
) -> Result<Vec<PlanComparison>> {
    let mut comparisons = compare_plans(plans, monthly_usage_kwh, current_rate, preferences)?;
    comparisons.truncate(RECOMMENDATION_COUNT);
    Ok(comparisons)
}

/// Annual savings of moving from `current_rate` to the plan with `plan_id`,
/// and how many months it takes to recover [`SWITCHING_COST`].
pub fn switching_savings(
    plans: &[ElectricityPlan],
    monthly_usage_kwh: f64,
    current_rate: f64,
    plan_id: i32,
) -> Result<SwitchingSavings> {
    ensure_positive("monthlyUsage", monthly_usage_kwh)?;
    ensure_positive("currentRate", current_rate)?;

    let plan = plans
        .iter()
        .find(|p| p.id == plan_id)
        .ok_or(Error::PlanNotFound(plan_id))?;

    let current_annual_cost = monthly_usage_kwh * current_rate * 12.0;
    let new_annual_cost = monthly_usage_kwh * plan.rate_per_kwh * 12.0;
    let annual_savings = current_annual_cost - new_annual_cost;

    let payback_period_months = if annual_savings > 0.0 {
        (SWITCHING_COST / (annual_savings / 12.0)).ceil() as u32
    } else {
        0
    };

    Ok(SwitchingSavings {
        current_annual_cost: round_to(current_annual_cost, 2),
        new_annual_cost: round_to(new_annual_cost, 2),
        annual_savings: round_to(annual_savings, 2),
        payback_period_months,
    })
}

fn compare_plan(
    plan: &ElectricityPlan,
    monthly_usage_kwh: f64,
    current_rate: f64,
    preferences: &PlanPreferences,
) -> PlanComparison {
    let monthly_cost = monthly_usage_kwh * plan.rate_per_kwh;
    let current_monthly_cost = monthly_usage_kwh * current_rate;
    let savings_vs_current = current_monthly_cost - monthly_cost;
    let savings_percentage = if current_monthly_cost == 0.0 {
        0.0
    } else {
        savings_vs_current / current_monthly_cost * 100.0
    };

    let score = recommendation_score(plan, savings_vs_current, savings_percentage, preferences);

    // Annual cost is derived from the rounded monthly figure so the two always agree.
    let monthly_cost = round_to(monthly_cost, 2);

    PlanComparison {
        plan: plan.clone(),
        monthly_cost,
        annual_cost: round_to(monthly_cost * 12.0, 2),
        savings_vs_current: round_to(savings_vs_current, 2),
        savings_percentage: round_to(savings_percentage, 1),
        recommendation_score: score,
    }
}

fn recommendation_score(
    plan: &ElectricityPlan,
    savings_vs_current: f64,
    savings_percentage: f64,
    preferences: &PlanPreferences,
) -> u8 {
    let mut score = BASE_SCORE;

    if savings_vs_current > 0.0 {
        score += MAX_SAVINGS_POINTS
            .min(savings_percentage / FULL_SAVINGS_PERCENTAGE * MAX_SAVINGS_POINTS);
    }

    if preferences.prefer_renewable {
        score += plan.renewable_percentage / 100.0 * MAX_RENEWABLE_POINTS;
    }

    if let Some(max_contract_length) = preferences.max_contract_length {
        if plan.contract_length <= max_contract_length {
            score += CONTRACT_FIT_POINTS;
        } else {
            score -= CONTRACT_MISFIT_PENALTY;
        }
    }

    if plan
        .additional_fees
        .to_lowercase()
        .contains("no early termination")
    {
        score += NO_TERMINATION_FEE_POINTS;
    }

    score.round().clamp(0.0, 100.0) as u8
}

fn ensure_positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidUsageValue { field, value })
    }
}
