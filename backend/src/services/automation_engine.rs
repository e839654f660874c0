use crate::{
    integrations::{WeatherProvider, WeatherReading},
    models::AutomationRule,
    services::condition_evaluator::{StateSnapshot, evaluate_condition, time_window},
    store::Store,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const FALLBACK_TEMPERATURE: f64 = 28.0;
const FALLBACK_HUMIDITY: f64 = 75.0;

/// Result of executing one rule during a pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub rule_id: i32,
    pub rule_name: String,
    pub success: bool,
    pub actions_applied: usize,
    pub message: String,
}

/// The automation engine that evaluates enabled rules and applies their actions
pub struct AutomationEngine {
    store: Arc<Store>,
    weather: Arc<dyn WeatherProvider>,
    timezone: Tz,
    poll_interval: Duration,
    last_weather: Mutex<Option<WeatherReading>>,
    pass: tokio::sync::Mutex<()>,
}

impl AutomationEngine {
    pub fn new(
        store: Arc<Store>,
        weather: Arc<dyn WeatherProvider>,
        timezone: Tz,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            weather,
            timezone,
            poll_interval,
            last_weather: Mutex::new(None),
            pass: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one pass at the current time
    pub async fn run(&self) -> Vec<ExecutionResult> {
        self.run_at(Utc::now()).await
    }

    /// Run one pass: snapshot the home, evaluate all enabled rules and execute the matching ones.
    /// Only rules that matched or failed to evaluate produce a result.
    ///
    /// Passes never overlap: a manual run waits for a scheduled tick in progress and vice versa.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Vec<ExecutionResult> {
        let _pass = self.pass.lock().await;
        let mut results = Vec::new();
        let snapshot = self.build_snapshot(now).await;

        let rules = self.store.rules.enabled();
        if rules.is_empty() {
            return results;
        }

        log::debug!("Evaluating {} enabled rules", rules.len());

        for rule in rules {
            if self.fired_this_window(&rule, now) {
                continue;
            }

            match evaluate_condition(&rule.condition, &snapshot) {
                Ok(true) => {
                    info!("Rule '{}' (id={}) triggered", rule.name, rule.id);
                    let result = self.execute_rule(&rule, now);
                    self.log_execution(&result);
                    results.push(result);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Rule '{}' (id={}) could not be evaluated: {}", rule.name, rule.id, e);
                    let result = ExecutionResult {
                        rule_id: rule.id,
                        rule_name: rule.name.clone(),
                        success: false,
                        actions_applied: 0,
                        message: format!("Condition evaluation failed: {}", e),
                    };
                    self.log_execution(&result);
                    results.push(result);
                }
            }
        }

        results
    }

    /// Capture everything conditions may look at, once per pass
    pub async fn build_snapshot(&self, now: DateTime<Utc>) -> StateSnapshot {
        let weather = self.current_weather().await;
        let home = self.store.home.get();

        StateSnapshot {
            time: now.with_timezone(&self.timezone).time(),
            window: self.poll_interval,
            temperature: weather.temperature,
            humidity: weather.humidity,
            presence: home.presence,
            price: home.electricity_price,
            device_states: self.store.devices.snapshot(),
        }
    }

    /// Latest weather, falling back to the last good reading and then to typical values
    async fn current_weather(&self) -> WeatherReading {
        match self.weather.current_weather().await {
            Ok(reading) => {
                *self
                    .last_weather
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(reading.clone());
                reading
            }
            Err(e) => {
                let last = self
                    .last_weather
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                match last {
                    Some(reading) => {
                        warn!("Weather unavailable ({}), reusing last reading", e);
                        reading
                    }
                    None => {
                        warn!(
                            "Weather unavailable ({}), assuming {}°C / {}%",
                            e, FALLBACK_TEMPERATURE, FALLBACK_HUMIDITY
                        );
                        WeatherReading {
                            temperature: FALLBACK_TEMPERATURE,
                            feels_like: FALLBACK_TEMPERATURE,
                            humidity: FALLBACK_HUMIDITY,
                            wind_speed: 0.0,
                            description: "unavailable".to_string(),
                            city: String::new(),
                        }
                    }
                }
            }
        }
    }

    /// A time condition holds for a whole window, so its rule fires once per window.
    fn fired_this_window(&self, rule: &AutomationRule, now: DateTime<Utc>) -> bool {
        if rule.condition.kind != "time" {
            return false;
        }
        let window = time_window(self.poll_interval);
        rule.last_triggered_at
            .is_some_and(|last| match (now - last).to_std() {
                Ok(elapsed) => elapsed < window,
                Err(_) => true,
            })
    }

    /// Apply every action of a triggered rule. A failing action does not stop the others.
    fn execute_rule(&self, rule: &AutomationRule, now: DateTime<Utc>) -> ExecutionResult {
        let mut applied = 0;
        let mut failures = Vec::new();

        for action in &rule.actions {
            match self.store.devices.apply_action(action) {
                Ok(_) => applied += 1,
                Err(e) => failures.push(format!("{} {}: {}", action.action.as_str(), action.device_id, e)),
            }
        }

        self.store.rules.mark_triggered(rule.id, now);

        let message = if failures.is_empty() {
            format!("Applied {} action(s)", applied)
        } else {
            format!(
                "Applied {} of {} action(s); {}",
                applied,
                rule.actions.len(),
                failures.join("; ")
            )
        };

        ExecutionResult {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            success: failures.is_empty(),
            actions_applied: applied,
            message,
        }
    }

    fn log_execution(&self, result: &ExecutionResult) {
        if !result.success {
            error!(
                "Rule '{}' (id={}) failed: {}",
                result.rule_name, result.rule_id, result.message
            );
        }
        self.store.rules.append_log(
            result.rule_id,
            &result.rule_name,
            result.success,
            result.message.clone(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::{ForecastDay, ProviderError};
    use crate::models::{ActionKind, ConditionSpec, RuleAction, RuleDraft};
    use crate::store::HomeStateUpdate;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::{Value as JsonValue, json};

    struct FixedWeather(Result<WeatherReading, ProviderError>);

    #[async_trait]
    impl WeatherProvider for FixedWeather {
        fn provider_name(&self) -> &'static str {
            "fixed"
        }

        async fn current_weather(&self) -> Result<WeatherReading, ProviderError> {
            self.0.clone()
        }

        async fn forecast(&self) -> Result<Vec<ForecastDay>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn reading(temperature: f64, humidity: f64) -> WeatherReading {
        WeatherReading {
            temperature,
            feels_like: temperature,
            humidity,
            wind_speed: 1.5,
            description: "test".to_string(),
            city: "Singapore".to_string(),
        }
    }

    fn engine_with(weather: Result<WeatherReading, ProviderError>) -> (Arc<Store>, AutomationEngine) {
        let store = Arc::new(Store::seeded(100, 0.3242));
        let engine = AutomationEngine::new(
            store.clone(),
            Arc::new(FixedWeather(weather)),
            chrono_tz::Asia::Singapore,
            Duration::from_secs(5),
        );
        (store, engine)
    }

    fn condition(kind: &str, operator: Option<&str>, value: JsonValue) -> ConditionSpec {
        ConditionSpec {
            kind: kind.to_string(),
            operator: operator.map(str::to_string),
            value,
            device_id: None,
        }
    }

    fn rule(name: &str, condition: ConditionSpec, actions: Vec<RuleAction>) -> RuleDraft {
        RuleDraft {
            name: name.to_string(),
            description: String::new(),
            condition,
            actions,
        }
    }

    fn action(device_id: &str, action: ActionKind, value: Option<f64>) -> RuleAction {
        RuleAction {
            device_id: device_id.to_string(),
            action,
            value,
        }
    }

    // 2024-06-01 07:00:02 in Singapore (UTC+8)
    fn seven_am() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 31, 23, 0, 2).unwrap()
    }

    #[actix_rt::test]
    async fn test_hot_weather_turns_on_ac() {
        let (store, engine) = engine_with(Ok(reading(31.0, 70.0)));
        store.devices.set_status("ac1", false).unwrap();
        let created = store
            .rules
            .create(rule(
                "Cool down",
                condition("temperature", Some(">"), json!(30)),
                vec![action("ac1", ActionKind::TurnOn, None)],
            ))
            .unwrap();

        let results = engine.run_at(seven_am()).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert_eq!(results[0].actions_applied, 1);
        assert!(store.devices.get("ac1").unwrap().status);
        assert!(store.rules.get(created.id).unwrap().last_triggered_at.is_some());
        assert_eq!(store.rules.logs_for(created.id, 10).unwrap().len(), 1);
    }

    #[actix_rt::test]
    async fn test_unmatched_rule_is_silent() {
        let (store, engine) = engine_with(Ok(reading(26.0, 70.0)));
        let created = store
            .rules
            .create(rule(
                "Cool down",
                condition("temperature", Some(">"), json!(30)),
                vec![action("ac1", ActionKind::TurnOn, None)],
            ))
            .unwrap();

        assert!(engine.run_at(seven_am()).await.is_empty());
        assert!(store.rules.logs_for(created.id, 10).unwrap().is_empty());
        assert!(store.rules.get(created.id).unwrap().last_triggered_at.is_none());
    }

    #[actix_rt::test]
    async fn test_disabled_rules_are_skipped() {
        let (store, engine) = engine_with(Ok(reading(26.0, 70.0)));
        store
            .home
            .update(HomeStateUpdate {
                presence: Some(false),
                electricity_price: None,
            })
            .unwrap();

        // The seeded presence rule matches but is disabled.
        assert!(engine.run_at(seven_am()).await.is_empty());
        assert!(store.devices.get("light1").unwrap().status);

        let seeded = store.rules.list()[0].id;
        store.rules.toggle(seeded).unwrap();
        let results = engine.run_at(seven_am()).await;
        assert_eq!(results.len(), 1);
        assert!(!store.devices.get("light1").unwrap().status);
        assert!(!store.devices.get("ac1").unwrap().status);
    }

    #[actix_rt::test]
    async fn test_time_rule_fires_once_per_window() {
        let (store, engine) = engine_with(Ok(reading(26.0, 70.0)));
        store
            .rules
            .create(rule(
                "Morning clean",
                condition("time", None, json!("07:00")),
                vec![action("vacuum1", ActionKind::TurnOn, None)],
            ))
            .unwrap();

        assert_eq!(engine.run_at(seven_am()).await.len(), 1);

        let next_poll = seven_am() + chrono::Duration::seconds(5);
        assert!(engine.run_at(next_poll).await.is_empty());

        let later = seven_am() + chrono::Duration::seconds(60);
        assert!(engine.run_at(later).await.is_empty());

        let next_day = seven_am() + chrono::Duration::days(1);
        assert_eq!(engine.run_at(next_day).await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overlapping_passes_fire_time_rule_once() {
        for _ in 0..20 {
            let (store, engine) = engine_with(Ok(reading(26.0, 70.0)));
            store
                .rules
                .create(rule(
                    "Morning clean",
                    condition("time", None, json!("07:00")),
                    vec![action("vacuum1", ActionKind::TurnOn, None)],
                ))
                .unwrap();

            let engine = Arc::new(engine);
            let scheduled = tokio::spawn({
                let engine = engine.clone();
                async move { engine.run_at(seven_am()).await.len() }
            });
            let manual = tokio::spawn({
                let engine = engine.clone();
                async move { engine.run_at(seven_am()).await.len() }
            });

            let fired = scheduled.await.unwrap() + manual.await.unwrap();
            assert_eq!(fired, 1);
            assert_eq!(store.rules.all_logs(10).len(), 1);
        }
    }

    #[actix_rt::test]
    async fn test_set_value_and_price_condition() {
        let (store, engine) = engine_with(Ok(reading(26.0, 70.0)));
        store
            .rules
            .create(rule(
                "Expensive power",
                condition("price", Some(">"), json!(0.30)),
                vec![action("ac1", ActionKind::SetValue, Some(26.0))],
            ))
            .unwrap();

        assert_eq!(engine.run_at(seven_am()).await.len(), 1);
        assert_eq!(store.devices.get("ac1").unwrap().value, Some(26.0));
    }

    #[actix_rt::test]
    async fn test_missing_device_fails_only_that_rule() {
        let (store, engine) = engine_with(Ok(reading(33.0, 70.0)));
        let broken = store
            .rules
            .create(rule(
                "Broken",
                condition("temperature", Some(">"), json!(30)),
                vec![
                    action("ghost", ActionKind::TurnOn, None),
                    action("vacuum1", ActionKind::TurnOn, None),
                ],
            ))
            .unwrap();
        store
            .rules
            .create(rule(
                "Working",
                condition("humidity", Some(">="), json!(70)),
                vec![action("light1", ActionKind::TurnOff, None)],
            ))
            .unwrap();

        let results = engine.run_at(seven_am()).await;
        assert_eq!(results.len(), 2);

        let failed = results.iter().find(|r| r.rule_id == broken.id).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.actions_applied, 1);
        assert!(failed.message.contains("ghost"));

        assert!(store.devices.get("vacuum1").unwrap().status);
        assert!(!store.devices.get("light1").unwrap().status);
        assert!(!store.rules.logs_for(broken.id, 1).unwrap()[0].success);
    }

    #[actix_rt::test]
    async fn test_unknown_condition_device_is_logged_failure() {
        let (store, engine) = engine_with(Ok(reading(26.0, 70.0)));
        let mut spec = condition("device_state", Some("="), json!(true));
        spec.device_id = Some("ac1".to_string());
        let created = store
            .rules
            .create(rule(
                "Follow AC",
                spec,
                vec![action("light1", ActionKind::TurnOff, None)],
            ))
            .unwrap();
        store.devices.delete("ac1").unwrap();

        let results = engine.run_at(seven_am()).await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(store.devices.get("light1").unwrap().status);
        assert!(store.rules.get(created.id).unwrap().last_triggered_at.is_none());
        assert_eq!(store.rules.all_logs(10).len(), 1);
    }

    #[actix_rt::test]
    async fn test_weather_failure_falls_back() {
        let (_store, engine) = engine_with(Err(ProviderError::RateLimited));
        let snapshot = engine.build_snapshot(seven_am()).await;
        assert_eq!(snapshot.temperature, FALLBACK_TEMPERATURE);
        assert_eq!(snapshot.humidity, FALLBACK_HUMIDITY);

        *engine.last_weather.lock().unwrap() = Some(reading(30.5, 82.0));
        let snapshot = engine.build_snapshot(seven_am()).await;
        assert_eq!(snapshot.temperature, 30.5);
        assert_eq!(snapshot.humidity, 82.0);
    }

    #[actix_rt::test]
    async fn test_snapshot_uses_local_time() {
        let (_store, engine) = engine_with(Ok(reading(26.0, 70.0)));
        let snapshot = engine.build_snapshot(seven_am()).await;
        assert_eq!(snapshot.time.format("%H:%M").to_string(), "07:00");
        assert_eq!(snapshot.device_states.len(), 3);
        assert!(snapshot.presence);
        assert_eq!(snapshot.price, 0.3242);
    }
}
