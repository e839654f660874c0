use crate::models::ElectricityPlan;
use crate::services::round_to;
use serde::Serialize;
use std::collections::BTreeSet;

/// (provider, plan name, rate per kWh, contract months, renewable %, fees, url)
type CatalogEntry = (&'static str, &'static str, f64, u32, f64, &'static str, &'static str);

// Typical Singapore open electricity market offers, 2024.
const SINGAPORE_PLANS: [CatalogEntry; 12] = [
    ("SP Group", "Regulated Tariff", 0.3242, 0, 0.0, "No additional fees", "https://www.spgroup.com.sg"),
    ("Geneco", "Fixed Price 12", 0.2890, 12, 0.0, "Early termination fee: $50", "https://www.geneco.sg"),
    ("Geneco", "Green Energy 24", 0.3150, 24, 100.0, "Early termination fee: $100", "https://www.geneco.sg"),
    ("Keppel Electric", "Fixed Rate 12", 0.2920, 12, 0.0, "Early termination fee: $50", "https://www.keppelelectric.com.sg"),
    ("Keppel Electric", "Eco Plan 24", 0.3080, 24, 50.0, "Early termination fee: $100", "https://www.keppelelectric.com.sg"),
    ("Senoko Energy", "Fixed Price 12", 0.2850, 12, 0.0, "No early termination fee", "https://www.senokoenergy.com"),
    ("Senoko Energy", "Green Plan 24", 0.3100, 24, 100.0, "No early termination fee", "https://www.senokoenergy.com"),
    ("iSwitch", "Fixed 12", 0.2880, 12, 0.0, "Early termination fee: $50", "https://www.iswitch.com.sg"),
    ("Ohm Energy", "Ohm Fixed 12", 0.2910, 12, 0.0, "Early termination fee: $50", "https://www.ohm.sg"),
    ("Sunseap Energy", "Solar Fixed 24", 0.3050, 24, 100.0, "Early termination fee: $100", "https://www.sunseap.com"),
    ("Tuas Power", "Fixed Rate 12", 0.2900, 12, 0.0, "Early termination fee: $50", "https://www.tuaspower.com.sg"),
    ("PacificLight", "Fixed 12", 0.2870, 12, 0.0, "Early termination fee: $50", "https://www.pacificlight.com.sg"),
];

/// The reference catalog, with ids assigned 1..=n in catalog order.
pub fn builtin_plans() -> Vec<ElectricityPlan> {
    SINGAPORE_PLANS
        .iter()
        .zip(1..)
        .map(
            |(&(provider, plan_name, rate, contract, renewable, fees, url), id)| ElectricityPlan {
                id,
                provider: provider.to_string(),
                plan_name: plan_name.to_string(),
                rate_per_kwh: rate,
                contract_length: contract,
                renewable_percentage: renewable,
                additional_fees: fees.to_string(),
                url: url.to_string(),
            },
        )
        .collect()
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlanStatistics {
    pub total_plans: usize,
    pub providers: usize,
    pub average_rate: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub renewable_plans: usize,
    pub no_contract_plans: usize,
    pub contract_lengths: Vec<u32>,
}

/// Summary of a catalog, `None` when it is empty.
pub fn plan_statistics(plans: &[ElectricityPlan]) -> Option<PlanStatistics> {
    if plans.is_empty() {
        return None;
    }

    let rates = plans.iter().map(|p| p.rate_per_kwh);
    let average_rate = rates.clone().sum::<f64>() / plans.len() as f64;
    let min_rate = rates.clone().fold(f64::INFINITY, f64::min);
    let max_rate = rates.fold(f64::NEG_INFINITY, f64::max);

    let providers: BTreeSet<&str> = plans.iter().map(|p| p.provider.as_str()).collect();
    let contract_lengths: BTreeSet<u32> = plans.iter().map(|p| p.contract_length).collect();

    Some(PlanStatistics {
        total_plans: plans.len(),
        providers: providers.len(),
        average_rate: round_to(average_rate, 4),
        min_rate,
        max_rate,
        renewable_plans: plans.iter().filter(|p| p.renewable_percentage > 0.0).count(),
        no_contract_plans: plans.iter().filter(|p| p.contract_length == 0).count(),
        contract_lengths: contract_lengths.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_plans_ids_are_sequential() {
        let plans = builtin_plans();
        assert_eq!(plans.len(), 12);
        let ids: Vec<i32> = plans.iter().map(|p| p.id).collect();
        assert_eq!(ids, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn test_builtin_plans_rates_positive() {
        for plan in builtin_plans() {
            assert!(plan.rate_per_kwh > 0.0, "{} has no rate", plan.plan_name);
            assert!((0.0..=100.0).contains(&plan.renewable_percentage));
        }
    }

    #[test]
    fn test_statistics() {
        let stats = plan_statistics(&builtin_plans()).unwrap();
        assert_eq!(stats.total_plans, 12);
        assert_eq!(stats.providers, 9);
        assert_eq!(stats.min_rate, 0.2850);
        assert_eq!(stats.max_rate, 0.3242);
        assert_eq!(stats.renewable_plans, 4);
        assert_eq!(stats.no_contract_plans, 1);
        assert_eq!(stats.contract_lengths, vec![0, 12, 24]);
        assert!(stats.average_rate > stats.min_rate && stats.average_rate < stats.max_rate);
    }

    #[test]
    fn test_statistics_empty_catalog() {
        assert!(plan_statistics(&[]).is_none());
    }
}
