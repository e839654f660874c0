//! In-memory registries for devices, rules, rule logs, plans, home state and
//! advisor conversations.
//!
//! Each registry is a plain keyed collection behind its own `RwLock` with
//! explicit CRUD functions. The [`Store`] owns all of them and is shared by
//! the HTTP workers and the automation scheduler.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod conversations;
pub mod devices;
pub mod home;
pub mod plans;
pub mod rules;

pub use conversations::ConversationLog;
pub use devices::DeviceRegistry;
pub use home::{HomeState, HomeStateUpdate, HomeStatus};
pub use plans::PlanCatalog;
pub use rules::{RuleRegistry, RuleUpdate};

pub struct Store {
    pub devices: DeviceRegistry,
    pub rules: RuleRegistry,
    pub plans: PlanCatalog,
    pub home: HomeStatus,
    pub conversations: ConversationLog,
}

impl Store {
    /// Empty store with the given rule-log capacity and starting electricity price.
    pub fn new(rule_log_capacity: usize, electricity_price: f64) -> Self {
        Self {
            devices: DeviceRegistry::default(),
            rules: RuleRegistry::new(rule_log_capacity),
            plans: PlanCatalog::default(),
            home: HomeStatus::new(electricity_price),
            conversations: ConversationLog::default(),
        }
    }

    /// Store populated with the default devices, the example rule and the plan catalog.
    pub fn seeded(rule_log_capacity: usize, electricity_price: f64) -> Self {
        let store = Self::new(rule_log_capacity, electricity_price);
        store.devices.seed_defaults();
        store.rules.seed_defaults();
        let count = store.plans.refresh();
        log::info!(
            "Store seeded: {} devices, {} rules, {} plans",
            store.devices.len(),
            store.rules.len(),
            count
        );
        store
    }
}

// A panic while holding a guard leaves plain data behind, so poisoning is ignored.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_store() {
        let store = Store::seeded(100, 0.3242);
        assert_eq!(store.devices.len(), 3);
        assert_eq!(store.rules.len(), 1);
        assert_eq!(store.plans.all().len(), 12);
        assert_eq!(store.home.get().electricity_price, 0.3242);
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = Store::new(100, 0.25);
        assert!(store.devices.list().is_empty());
        assert!(store.rules.list().is_empty());
        assert!(store.plans.all().is_empty());
        assert!(store.conversations.is_empty());
    }
}
