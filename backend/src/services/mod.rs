pub mod advisor;
pub mod automation_engine;
pub mod condition_evaluator;
pub mod energy_impact;
pub mod plan_catalog;
pub mod plan_scorer;
pub mod scheduler;

/// Round to `decimals` places with halves going up, so -2.5 becomes -2 and 2.5 becomes 3.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}
