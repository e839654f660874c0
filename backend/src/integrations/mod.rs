use crate::models::{Device, DeviceType, RuleDraft};
use crate::store::HomeState;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub mod openai;
pub mod weather;

pub use openai::{DisabledAdvisor, DisabledRuleParser, OpenAiAdvisor, OpenAiRuleParser};
pub use weather::{OpenWeatherProvider, SimulatedWeather};

/// Device found on the local network but not yet onboarded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub room: String,
    pub icon: String,
    pub manufacturer: String,
    pub model: String,
}

/// Simulated network scan. Every call yields fresh ids.
pub fn discover_devices() -> Vec<DiscoveredDevice> {
    let candidates = [
        ("Smart Bulb", DeviceType::Light, "Bedroom", "Philips Hue", "A19"),
        ("Smart Plug", DeviceType::Plug, "Living Room", "TP-Link", "HS100"),
    ];

    candidates
        .into_iter()
        .map(|(name, device_type, room, manufacturer, model)| DiscoveredDevice {
            id: format!("device_{}", uuid::Uuid::new_v4().simple()),
            name: name.to_string(),
            device_type,
            room: room.to_string(),
            icon: device_type.default_icon().to_string(),
            manufacturer: manufacturer.to_string(),
            model: model.to_string(),
        })
        .collect()
}

/// Current outdoor conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub description: String,
    pub city: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// One day of forecast, aggregated from the provider's intraday samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temperature: TemperatureRange,
    pub humidity: f64,
    pub description: String,
}

/// Error types for weather provider operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Rate limited by provider")]
    RateLimited,
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// Source of outdoor temperature and humidity
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Identifier shown in logs (e.g., "openweathermap", "simulated")
    fn provider_name(&self) -> &'static str;

    async fn current_weather(&self) -> Result<WeatherReading, ProviderError>;

    /// Up to five days, earliest first
    async fn forecast(&self) -> Result<Vec<ForecastDay>, ProviderError>;
}

/// Error types for natural-language rule parsing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Natural language rule parsing is not configured")]
    Unavailable,
    #[error("Rule parser request failed: {0}")]
    Request(String),
    #[error("Could not understand the rule: {0}")]
    InvalidResponse(String),
}

/// Turns free text into a rule draft
#[async_trait]
pub trait RuleParser: Send + Sync {
    async fn parse_rule(&self, text: &str) -> Result<RuleDraft, ParseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// Earlier message of a conversation, sent back by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// What the advisor is told about the home
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorContext {
    pub devices: Vec<Device>,
    pub weather: Option<WeatherReading>,
    pub home: HomeState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnusualExplanation {
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdvisorError {
    #[error("Energy advisor is not configured")]
    Unavailable,
    #[error("Energy advisor request failed: {0}")]
    Request(String),
    #[error("Energy advisor returned an unusable answer: {0}")]
    InvalidResponse(String),
}

/// Conversational energy-saving assistant
#[async_trait]
pub trait EnergyAdvisor: Send + Sync {
    async fn chat(
        &self,
        message: &str,
        history: &[ChatTurn],
        context: &AdvisorContext,
    ) -> Result<String, AdvisorError>;

    async fn recommendations(&self, context: &AdvisorContext) -> Result<Vec<String>, AdvisorError>;

    /// Likely causes of consumption well above the usual level
    async fn explain_unusual(
        &self,
        current_kwh: f64,
        average_kwh: f64,
        active_devices: &[Device],
    ) -> Result<UnusualExplanation, AdvisorError>;
}

/// External collaborators, chosen from configuration at startup
#[derive(Clone)]
pub struct Integrations {
    pub weather: Arc<dyn WeatherProvider>,
    pub rule_parser: Arc<dyn RuleParser>,
    pub advisor: Arc<dyn EnergyAdvisor>,
}

impl Integrations {
    pub fn from_config(config: &crate::config::Config) -> Self {
        let weather: Arc<dyn WeatherProvider> = match &config.openweather_api_key {
            Some(key) => Arc::new(OpenWeatherProvider::new(
                key.clone(),
                config.weather_city.clone(),
                config.weather_cache,
            )),
            None => {
                log::warn!("OPENWEATHER_API_KEY not set, using simulated weather");
                Arc::new(SimulatedWeather::new(config.weather_city.clone()))
            }
        };

        let (rule_parser, advisor): (Arc<dyn RuleParser>, Arc<dyn EnergyAdvisor>) =
            match &config.openai_api_key {
                Some(key) => {
                    let chat = openai::ChatClient::new(
                        key.clone(),
                        config.openai_model.clone(),
                        config.openai_base_url.clone(),
                    );
                    (
                        Arc::new(OpenAiRuleParser::from_client(chat.clone())),
                        Arc::new(OpenAiAdvisor::new(chat)),
                    )
                }
                None => {
                    log::warn!(
                        "OPENAI_API_KEY not set, natural language rules and the energy advisor are disabled"
                    );
                    (Arc::new(DisabledRuleParser), Arc::new(DisabledAdvisor))
                }
            };

        log::info!("Weather provider: {}", weather.provider_name());

        Self {
            weather,
            rule_parser,
            advisor,
        }
    }
}
