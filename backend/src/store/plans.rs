use super::{read, write};
use crate::models::ElectricityPlan;
use crate::services::plan_catalog::builtin_plans;
use std::sync::RwLock;

#[derive(Default)]
pub struct PlanCatalog {
    plans: RwLock<Vec<ElectricityPlan>>,
}

impl PlanCatalog {
    /// Reload the built-in catalog, returning the plan count.
    pub fn refresh(&self) -> usize {
        self.replace_all(builtin_plans())
    }

    /// Swap the whole catalog, renumbering ids 1..=n.
    pub fn replace_all(&self, plans: Vec<ElectricityPlan>) -> usize {
        let plans: Vec<ElectricityPlan> = plans
            .into_iter()
            .zip(1..)
            .map(|(plan, id)| ElectricityPlan { id, ..plan })
            .collect();
        let count = plans.len();
        *write(&self.plans) = plans;
        log::info!("Plan catalog refreshed with {} plans", count);
        count
    }

    /// All plans, cheapest rate first.
    pub fn all(&self) -> Vec<ElectricityPlan> {
        let mut plans = read(&self.plans).clone();
        plans.sort_by(|a, b| a.rate_per_kwh.total_cmp(&b.rate_per_kwh));
        plans
    }

    /// Run `f` against the catalog without cloning it.
    pub fn with_plans<R>(&self, f: impl FnOnce(&[ElectricityPlan]) -> R) -> R {
        f(&read(&self.plans))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_loads_catalog() {
        let catalog = PlanCatalog::default();
        assert!(catalog.all().is_empty());
        assert_eq!(catalog.refresh(), 12);
        assert_eq!(catalog.refresh(), 12);
        assert_eq!(catalog.with_plans(|p| p.len()), 12);
    }

    #[test]
    fn test_all_sorted_by_rate() {
        let catalog = PlanCatalog::default();
        catalog.refresh();
        let rates: Vec<f64> = catalog.all().iter().map(|p| p.rate_per_kwh).collect();
        assert!(rates.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(catalog.all()[0].provider, "Senoko Energy");
    }

    #[test]
    fn test_replace_all_renumbers() {
        let catalog = PlanCatalog::default();
        let mut plans = builtin_plans();
        plans.truncate(2);
        plans[0].id = 40;
        plans[1].id = 41;
        catalog.replace_all(plans);
        let ids: Vec<(i32, String)> =
            catalog.with_plans(|p| p.iter().map(|p| (p.id, p.provider.clone())).collect());
        assert_eq!(ids[0], (1, "SP Group".to_string()));
        assert_eq!(ids[1].0, 2);
    }
}
