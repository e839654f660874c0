use super::{read, write};
use crate::error::{Error, Result};
use crate::models::{ActionKind, AutomationRule, ConditionSpec, RuleAction, RuleDraft, RuleLog};
use crate::services::condition_evaluator::Condition;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::RwLock;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Partial update of a rule. Absent fields are left untouched.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RuleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub condition: Option<ConditionSpec>,
    #[serde(alias = "action")]
    pub actions: Option<Vec<RuleAction>>,
    pub enabled: Option<bool>,
}

impl RuleUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.condition.is_none()
            && self.actions.is_none()
            && self.enabled.is_none()
    }
}

pub struct RuleRegistry {
    rules: RwLock<BTreeMap<i32, AutomationRule>>,
    logs: RwLock<VecDeque<RuleLog>>,
    log_capacity: usize,
    next_rule_id: AtomicI32,
    next_log_id: AtomicU64,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl RuleRegistry {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            rules: RwLock::new(BTreeMap::new()),
            logs: RwLock::new(VecDeque::new()),
            log_capacity: log_capacity.max(1),
            next_rule_id: AtomicI32::new(1),
            next_log_id: AtomicU64::new(1),
        }
    }

    /// All rules, newest first.
    pub fn list(&self) -> Vec<AutomationRule> {
        let mut rules: Vec<AutomationRule> = read(&self.rules).values().cloned().collect();
        rules.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        rules
    }

    /// Enabled rules in creation order.
    pub fn enabled(&self) -> Vec<AutomationRule> {
        read(&self.rules)
            .values()
            .filter(|r| r.enabled)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        read(&self.rules).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: i32) -> Result<AutomationRule> {
        read(&self.rules)
            .get(&id)
            .cloned()
            .ok_or(Error::RuleNotFound(id))
    }

    /// Store a new rule. It starts enabled.
    pub fn create(&self, draft: RuleDraft) -> Result<AutomationRule> {
        validate_draft(&draft)?;

        let now = Utc::now();
        let id = self.next_rule_id.fetch_add(1, Ordering::SeqCst);
        let rule = AutomationRule {
            id,
            name: draft.name.trim().to_string(),
            description: draft.description,
            condition: draft.condition,
            actions: draft.actions,
            enabled: true,
            created_at: now,
            updated_at: now,
            last_triggered_at: None,
        };
        write(&self.rules).insert(id, rule.clone());
        log::info!("Created rule {} '{}'", id, rule.name);
        Ok(rule)
    }

    pub fn update(&self, id: i32, update: RuleUpdate) -> Result<AutomationRule> {
        if update.is_empty() {
            return Err(Error::InvalidRule("no fields to update".to_string()));
        }

        let mut rules = write(&self.rules);
        let current = rules.get(&id).ok_or(Error::RuleNotFound(id))?;

        let draft = RuleDraft {
            name: update.name.unwrap_or_else(|| current.name.clone()),
            description: update
                .description
                .unwrap_or_else(|| current.description.clone()),
            condition: update.condition.unwrap_or_else(|| current.condition.clone()),
            actions: update.actions.unwrap_or_else(|| current.actions.clone()),
        };
        validate_draft(&draft)?;

        let enabled = update.enabled.unwrap_or(current.enabled);
        let rule = rules.get_mut(&id).ok_or(Error::RuleNotFound(id))?;
        rule.name = draft.name.trim().to_string();
        rule.description = draft.description;
        rule.condition = draft.condition;
        rule.actions = draft.actions;
        rule.enabled = enabled;
        rule.updated_at = Utc::now();
        Ok(rule.clone())
    }

    /// Flip the enabled flag.
    pub fn toggle(&self, id: i32) -> Result<AutomationRule> {
        let mut rules = write(&self.rules);
        let rule = rules.get_mut(&id).ok_or(Error::RuleNotFound(id))?;
        rule.enabled = !rule.enabled;
        rule.updated_at = Utc::now();
        log::info!(
            "Rule {} '{}' {}",
            id,
            rule.name,
            if rule.enabled { "enabled" } else { "disabled" }
        );
        Ok(rule.clone())
    }

    /// Remove a rule together with its execution history.
    pub fn delete(&self, id: i32) -> Result<AutomationRule> {
        let removed = write(&self.rules)
            .remove(&id)
            .ok_or(Error::RuleNotFound(id))?;
        write(&self.logs).retain(|entry| entry.rule_id != id);
        Ok(removed)
    }

    pub fn mark_triggered(&self, id: i32, at: DateTime<Utc>) {
        if let Some(rule) = write(&self.rules).get_mut(&id) {
            rule.last_triggered_at = Some(at);
        }
    }

    /// Record one execution. The oldest entry is evicted once capacity is reached.
    pub fn append_log(&self, rule_id: i32, rule_name: &str, success: bool, message: String) -> RuleLog {
        let entry = RuleLog {
            id: self.next_log_id.fetch_add(1, Ordering::SeqCst),
            rule_id,
            rule_name: rule_name.to_string(),
            executed_at: Utc::now(),
            success,
            message,
        };

        let mut logs = write(&self.logs);
        while logs.len() >= self.log_capacity {
            logs.pop_front();
        }
        logs.push_back(entry.clone());
        entry
    }

    /// Most recent executions of one rule, newest first.
    pub fn logs_for(&self, rule_id: i32, limit: usize) -> Result<Vec<RuleLog>> {
        if !read(&self.rules).contains_key(&rule_id) {
            return Err(Error::RuleNotFound(rule_id));
        }
        Ok(read(&self.logs)
            .iter()
            .rev()
            .filter(|entry| entry.rule_id == rule_id)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Most recent executions across all rules, newest first.
    pub fn all_logs(&self, limit: usize) -> Vec<RuleLog> {
        read(&self.logs).iter().rev().take(limit).cloned().collect()
    }

    pub fn seed_defaults(&self) {
        if !self.is_empty() {
            return;
        }

        let draft = RuleDraft {
            name: "Energy Saver".to_string(),
            description: "Turn off lights and AC when nobody is home".to_string(),
            condition: ConditionSpec {
                kind: "presence".to_string(),
                operator: Some("=".to_string()),
                value: serde_json::Value::Bool(false),
                device_id: None,
            },
            actions: vec![
                RuleAction {
                    device_id: "light1".to_string(),
                    action: ActionKind::TurnOff,
                    value: None,
                },
                RuleAction {
                    device_id: "ac1".to_string(),
                    action: ActionKind::TurnOff,
                    value: None,
                },
            ],
        };

        match self.create(draft) {
            Ok(rule) => {
                if let Some(stored) = write(&self.rules).get_mut(&rule.id) {
                    stored.enabled = false;
                }
            }
            Err(e) => log::error!("Failed to seed default rule: {}", e),
        }
    }
}

/// Check a rule before it is stored: a name, an evaluable condition and at
/// least one well-formed action.
pub fn validate_draft(draft: &RuleDraft) -> Result<()> {
    if draft.name.trim().is_empty() {
        return Err(Error::InvalidRule("name is required".to_string()));
    }

    Condition::try_from(&draft.condition)?;

    if draft.actions.is_empty() {
        return Err(Error::InvalidRule(
            "at least one action is required".to_string(),
        ));
    }

    for action in &draft.actions {
        if action.device_id.trim().is_empty() {
            return Err(Error::InvalidAction("deviceId is required".to_string()));
        }
        if action.action == ActionKind::SetValue
            && !action.value.is_some_and(f64::is_finite)
        {
            return Err(Error::InvalidAction(format!(
                "setValue on '{}' requires a numeric value",
                action.device_id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(name: &str) -> RuleDraft {
        RuleDraft {
            name: name.to_string(),
            description: String::new(),
            condition: ConditionSpec {
                kind: "temperature".to_string(),
                operator: Some(">".to_string()),
                value: json!(30),
                device_id: None,
            },
            actions: vec![RuleAction {
                device_id: "ac1".to_string(),
                action: ActionKind::TurnOn,
                value: None,
            }],
        }
    }

    #[test]
    fn test_create_assigns_ids_and_enables() {
        let registry = RuleRegistry::default();
        let first = registry.create(draft("Cool down")).unwrap();
        let second = registry.create(draft("Cool down again")).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(first.enabled);
        assert!(first.last_triggered_at.is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let registry = RuleRegistry::default();
        registry.create(draft("first")).unwrap();
        registry.create(draft("second")).unwrap();
        let names: Vec<String> = registry.list().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn test_create_rejects_invalid_rules() {
        let registry = RuleRegistry::default();

        let mut bad = draft("bad");
        bad.condition.kind = "weather".to_string();
        assert_eq!(
            registry.create(bad).unwrap_err(),
            Error::UnsupportedConditionType("weather".to_string())
        );

        let mut bad = draft("bad");
        bad.actions.clear();
        assert!(matches!(registry.create(bad), Err(Error::InvalidRule(_))));

        let mut bad = draft("bad");
        bad.actions[0].action = ActionKind::SetValue;
        assert!(matches!(registry.create(bad), Err(Error::InvalidAction(_))));

        assert!(matches!(registry.create(draft("  ")), Err(Error::InvalidRule(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_partial_update() {
        let registry = RuleRegistry::default();
        let rule = registry.create(draft("Cool down")).unwrap();

        let updated = registry
            .update(
                rule.id,
                RuleUpdate {
                    name: Some("Cool bedroom".to_string()),
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Cool bedroom");
        assert!(!updated.enabled);
        assert_eq!(updated.actions, rule.actions);
        assert_eq!(updated.condition, rule.condition);
    }

    #[test]
    fn test_update_validation() {
        let registry = RuleRegistry::default();
        let rule = registry.create(draft("Cool down")).unwrap();

        assert!(matches!(
            registry.update(rule.id, RuleUpdate::default()),
            Err(Error::InvalidRule(_))
        ));

        let bad_operator = RuleUpdate {
            condition: Some(ConditionSpec {
                kind: "humidity".to_string(),
                operator: Some("!=".to_string()),
                value: json!(50),
                device_id: None,
            }),
            ..Default::default()
        };
        assert_eq!(
            registry.update(rule.id, bad_operator).unwrap_err(),
            Error::UnsupportedOperator("!=".to_string())
        );
        assert_eq!(registry.get(rule.id).unwrap().condition, rule.condition);

        assert_eq!(
            registry
                .update(99, RuleUpdate { enabled: Some(true), ..Default::default() })
                .unwrap_err(),
            Error::RuleNotFound(99)
        );
    }

    #[test]
    fn test_update_accepts_action_alias() {
        let update: RuleUpdate = serde_json::from_value(json!({
            "action": [{ "deviceId": "light1", "action": "turnOff" }]
        }))
        .unwrap();
        assert_eq!(update.actions.unwrap().len(), 1);
    }

    #[test]
    fn test_toggle() {
        let registry = RuleRegistry::default();
        let rule = registry.create(draft("Cool down")).unwrap();
        assert!(!registry.toggle(rule.id).unwrap().enabled);
        assert!(registry.enabled().is_empty());
        assert!(registry.toggle(rule.id).unwrap().enabled);
        assert_eq!(registry.enabled().len(), 1);
    }

    #[test]
    fn test_delete_removes_logs() {
        let registry = RuleRegistry::default();
        let keep = registry.create(draft("keep")).unwrap();
        let gone = registry.create(draft("gone")).unwrap();
        registry.append_log(keep.id, &keep.name, true, "ok".to_string());
        registry.append_log(gone.id, &gone.name, true, "ok".to_string());

        registry.delete(gone.id).unwrap();
        assert_eq!(registry.all_logs(10).len(), 1);
        assert_eq!(registry.logs_for(gone.id, 10).unwrap_err(), Error::RuleNotFound(gone.id));
        assert!(registry.delete(gone.id).is_err());
    }

    #[test]
    fn test_logs_newest_first_and_limited() {
        let registry = RuleRegistry::default();
        let rule = registry.create(draft("Cool down")).unwrap();
        for i in 0..5 {
            registry.append_log(rule.id, &rule.name, i % 2 == 0, format!("run {}", i));
        }

        let logs = registry.logs_for(rule.id, 3).unwrap();
        let messages: Vec<&str> = logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["run 4", "run 3", "run 2"]);
        assert_eq!(logs[0].rule_name, "Cool down");
    }

    #[test]
    fn test_log_ring_evicts_oldest() {
        let registry = RuleRegistry::new(3);
        let rule = registry.create(draft("Cool down")).unwrap();
        for i in 0..5 {
            registry.append_log(rule.id, &rule.name, true, format!("run {}", i));
        }

        let logs = registry.all_logs(10);
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "run 4");
        assert_eq!(logs[2].message, "run 2");
        assert!(logs[0].id > logs[2].id);
    }

    #[test]
    fn test_mark_triggered() {
        let registry = RuleRegistry::default();
        let rule = registry.create(draft("Cool down")).unwrap();
        let at = Utc::now();
        registry.mark_triggered(rule.id, at);
        assert_eq!(registry.get(rule.id).unwrap().last_triggered_at, Some(at));
    }

    #[test]
    fn test_seed_defaults_is_disabled() {
        let registry = RuleRegistry::default();
        registry.seed_defaults();
        let rules = registry.list();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "Energy Saver");
        assert!(!rules[0].enabled);
        assert_eq!(rules[0].actions.len(), 2);
    }
}
