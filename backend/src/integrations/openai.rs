use super::{
    AdvisorContext, AdvisorError, ChatTurn, EnergyAdvisor, ParseError, RuleParser,
    UnusualExplanation,
};
use crate::models::{Device, RuleDraft};
use crate::store::rules::validate_draft;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Upper bound on one completion round trip
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const RULE_PROMPT: &str = r#"You convert natural language into structured automation rules for a smart home system.

Available device types: light, aircon, vacuum, kettle, blinds, plug, fan, heater, lock, camera, speaker, tv
Available condition types: time, temperature, humidity, device_state, presence, price
Available operators: >, <, =, >=, <=
Available actions: turnOn, turnOff, setValue

Reply with a JSON object of this shape:
{
  "name": "Short rule name",
  "description": "Detailed description",
  "condition": {
    "type": "time|temperature|humidity|device_state|presence|price",
    "operator": ">|<|=|>=|<=",
    "value": "condition value",
    "deviceId": "device id, only for device_state conditions"
  },
  "actions": [
    { "deviceId": "device id", "action": "turnOn|turnOff|setValue", "value": 24 }
  ]
}

Time values use 24-hour "HH:MM". Presence values are true or false. Prices are per kWh.

Example input: "Reduce AC usage when electricity prices are high"
Example output: {"name":"AC Reduction on High Prices","description":"Raise the AC setpoint when electricity is expensive","condition":{"type":"price","operator":">","value":0.35},"actions":[{"deviceId":"ac1","action":"setValue","value":26}]}

Return ONLY valid JSON."#;

const ADVISOR_PROMPT: &str = "You are an energy advisor for a smart home in Singapore.

Help the user understand their energy consumption, suggest behavioural changes and \
automation rules, and explain how the weather affects usage.

Singapore context: tropical climate averaging 26-32°C, high humidity all year, \
electricity around SGD 0.25-0.35 per kWh, peak hours 7-11 PM, and air conditioning \
is the largest consumer in most homes.

Be friendly, concise and practical. Quote costs in SGD.";

const RECOMMENDATIONS_PROMPT: &str = "You are an energy efficiency expert for smart homes in Singapore. \
Analyse the current state of the home and give 3-5 specific, actionable recommendations to reduce \
energy consumption, taking the tropical climate and local electricity rates into account. \
Reply with a JSON object of the form {\"recommendations\": [\"...\"]}.";

const UNUSUAL_PROMPT: &str = "You are analysing unusually high energy consumption in a smart home. \
Identify the likely causes and suggest fixes. \
Reply with a JSON object of the form {\"message\": \"short explanation\", \"suggestions\": [\"...\"]}.";

#[derive(Deserialize, Debug)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: Message,
}

#[derive(Deserialize, Debug)]
struct Message {
    content: Option<String>,
}

#[derive(Debug)]
enum CompletionError {
    Request(String),
    InvalidResponse(String),
}

impl From<CompletionError> for ParseError {
    fn from(e: CompletionError) -> Self {
        match e {
            CompletionError::Request(msg) => ParseError::Request(msg),
            CompletionError::InvalidResponse(msg) => ParseError::InvalidResponse(msg),
        }
    }
}

impl From<CompletionError> for AdvisorError {
    fn from(e: CompletionError) -> Self {
        match e {
            CompletionError::Request(msg) => AdvisorError::Request(msg),
            CompletionError::InvalidResponse(msg) => AdvisorError::InvalidResponse(msg),
        }
    }
}

/// Messages and sampling settings for one completion
struct Prompt {
    messages: Vec<serde_json::Value>,
    temperature: f64,
    json_object: bool,
    max_tokens: Option<u32>,
}

impl Prompt {
    fn new(system: &str, user: &str, temperature: f64) -> Self {
        Self {
            messages: vec![
                json!({ "role": "system", "content": system }),
                json!({ "role": "user", "content": user }),
            ],
            temperature,
            json_object: true,
            max_tokens: None,
        }
    }
}

/// Client for an OpenAI-compatible chat completions endpoint
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn complete(&self, prompt: Prompt) -> Result<String, CompletionError> {
        let mut body = json!({
            "model": self.model,
            "messages": prompt.messages,
            "temperature": prompt.temperature,
        });
        if prompt.json_object {
            body["response_format"] = json!({ "type": "json_object" });
        }
        if let Some(max_tokens) = prompt.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let completion = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| CompletionError::Request(e.to_string()))?
            .json::<ChatCompletion>()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| CompletionError::InvalidResponse("no content in completion".to_string()))
    }
}

/// Rule parser backed by an OpenAI-compatible chat completions endpoint
pub struct OpenAiRuleParser {
    chat: ChatClient,
}

impl OpenAiRuleParser {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Self {
        Self::from_client(ChatClient::new(api_key, model, base_url))
    }

    pub fn from_client(chat: ChatClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl RuleParser for OpenAiRuleParser {
    async fn parse_rule(&self, text: &str) -> Result<RuleDraft, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseError::InvalidResponse("empty rule text".to_string()));
        }

        let content = self.chat.complete(Prompt::new(RULE_PROMPT, text, 0.3)).await?;
        log::debug!("Rule parser returned: {}", content);
        parse_completion(&content)
    }
}

/// Decode and check the model's JSON. Anything that would not make a valid rule is rejected.
pub fn parse_completion(content: &str) -> Result<RuleDraft, ParseError> {
    let draft: RuleDraft = serde_json::from_str(content)
        .map_err(|e| ParseError::InvalidResponse(e.to_string()))?;
    validate_draft(&draft).map_err(|e| ParseError::InvalidResponse(e.to_string()))?;
    Ok(draft)
}

/// Used when no API key is configured
pub struct DisabledRuleParser;

#[async_trait]
impl RuleParser for DisabledRuleParser {
    async fn parse_rule(&self, _text: &str) -> Result<RuleDraft, ParseError> {
        Err(ParseError::Unavailable)
    }
}

/// Energy advisor on the same chat completions endpoint as the rule parser
pub struct OpenAiAdvisor {
    chat: ChatClient,
}

impl OpenAiAdvisor {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

fn context_json(context: &AdvisorContext) -> Result<String, AdvisorError> {
    serde_json::to_string(context).map_err(|e| AdvisorError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl EnergyAdvisor for OpenAiAdvisor {
    async fn chat(
        &self,
        message: &str,
        history: &[ChatTurn],
        context: &AdvisorContext,
    ) -> Result<String, AdvisorError> {
        let system = format!("{}\n\nThe user's home right now: {}", ADVISOR_PROMPT, context_json(context)?);

        let mut messages = vec![json!({ "role": "system", "content": system })];
        messages.extend(
            history
                .iter()
                .map(|turn| json!({ "role": turn.role.as_str(), "content": turn.content })),
        );
        messages.push(json!({ "role": "user", "content": message }));

        let prompt = Prompt {
            messages,
            temperature: 0.7,
            json_object: false,
            max_tokens: Some(500),
        };
        Ok(self.chat.complete(prompt).await?)
    }

    async fn recommendations(&self, context: &AdvisorContext) -> Result<Vec<String>, AdvisorError> {
        let content = self
            .chat
            .complete(Prompt::new(RECOMMENDATIONS_PROMPT, &context_json(context)?, 0.7))
            .await?;
        parse_recommendations(&content)
    }

    async fn explain_unusual(
        &self,
        current_kwh: f64,
        average_kwh: f64,
        active_devices: &[Device],
    ) -> Result<UnusualExplanation, AdvisorError> {
        let devices = serde_json::to_string(active_devices)
            .map_err(|e| AdvisorError::InvalidResponse(e.to_string()))?;
        let user = format!(
            "Current energy usage: {} kWh\nHistorical average: {} kWh\nIncrease: {:.1}%\nActive devices: {}",
            current_kwh,
            average_kwh,
            (current_kwh / average_kwh - 1.0) * 100.0,
            devices
        );

        let content = self.chat.complete(Prompt::new(UNUSUAL_PROMPT, &user, 0.5)).await?;
        serde_json::from_str(&content).map_err(|e| AdvisorError::InvalidResponse(e.to_string()))
    }
}

/// Accepts `{"recommendations": [...]}` or a bare array.
pub fn parse_recommendations(content: &str) -> Result<Vec<String>, AdvisorError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Reply {
        Wrapped { recommendations: Vec<String> },
        Bare(Vec<String>),
    }

    match serde_json::from_str(content) {
        Ok(Reply::Wrapped { recommendations }) | Ok(Reply::Bare(recommendations)) => {
            Ok(recommendations)
        }
        Err(e) => Err(AdvisorError::InvalidResponse(e.to_string())),
    }
}

/// Used when no API key is configured
pub struct DisabledAdvisor;

#[async_trait]
impl EnergyAdvisor for DisabledAdvisor {
    async fn chat(
        &self,
        _message: &str,
        _history: &[ChatTurn],
        _context: &AdvisorContext,
    ) -> Result<String, AdvisorError> {
        Err(AdvisorError::Unavailable)
    }

    async fn recommendations(&self, _context: &AdvisorContext) -> Result<Vec<String>, AdvisorError> {
        Err(AdvisorError::Unavailable)
    }

    async fn explain_unusual(
        &self,
        _current_kwh: f64,
        _average_kwh: f64,
        _active_devices: &[Device],
    ) -> Result<UnusualExplanation, AdvisorError> {
        Err(AdvisorError::Unavailable)
    }
}
