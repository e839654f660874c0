use chrono_tz::Tz;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Time rules match in a window as wide as the poll interval, which must stay under a day.
const MAX_AUTOMATION_INTERVAL_SECS: u64 = 24 * 3600;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Runtime settings read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub automation_enabled: bool,
    pub automation_interval: Duration,
    pub timezone: Tz,
    pub current_rate: f64,
    pub rule_log_capacity: usize,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub openweather_api_key: Option<String>,
    pub weather_city: String,
    pub weather_cache: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            automation_enabled: true,
            automation_interval: Duration::from_secs(5),
            timezone: chrono_tz::Asia::Singapore,
            current_rate: 0.3242,
            rule_log_capacity: 1000,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: None,
            openweather_api_key: None,
            weather_city: "Singapore".to_string(),
            weather_cache: Duration::from_secs(600),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let automation_interval_secs: u64 =
            parse_or(&get, "AUTOMATION_INTERVAL_SECS", defaults.automation_interval.as_secs())?;
        if !(1..MAX_AUTOMATION_INTERVAL_SECS).contains(&automation_interval_secs) {
            return Err(invalid(
                "AUTOMATION_INTERVAL_SECS",
                &automation_interval_secs.to_string(),
            ));
        }

        let current_rate: f64 = parse_or(&get, "CURRENT_RATE", defaults.current_rate)?;
        if !current_rate.is_finite() || current_rate <= 0.0 {
            return Err(invalid("CURRENT_RATE", &current_rate.to_string()));
        }

        let rule_log_capacity: usize =
            parse_or(&get, "RULE_LOG_CAPACITY", defaults.rule_log_capacity)?;
        if rule_log_capacity == 0 {
            return Err(invalid("RULE_LOG_CAPACITY", "0"));
        }

        let automation_enabled = match get("AUTOMATION_ENABLED") {
            Some(v) => parse_flag(&v).ok_or_else(|| invalid("AUTOMATION_ENABLED", &v))?,
            None => defaults.automation_enabled,
        };

        let weather_cache_secs: u64 =
            parse_or(&get, "WEATHER_CACHE_SECS", defaults.weather_cache.as_secs())?;

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            automation_enabled,
            automation_interval: Duration::from_secs(automation_interval_secs),
            timezone: parse_or(&get, "TIMEZONE", defaults.timezone)?,
            current_rate,
            rule_log_capacity,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: get("OPENAI_BASE_URL"),
            openweather_api_key: get("OPENWEATHER_API_KEY"),
            weather_city: get("WEATHER_CITY").unwrap_or(defaults.weather_city),
            weather_cache: Duration::from_secs(weather_cache_secs),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| invalid(key, &raw)),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}
