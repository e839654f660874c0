use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ============================================================================
// Devices
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Light,
    Aircon,
    Vacuum,
    Kettle,
    Blinds,
    Plug,
    Fan,
    Heater,
    Lock,
    Camera,
    Speaker,
    Tv,
}

impl DeviceType {
    pub const ALL: [DeviceType; 12] = [
        DeviceType::Light,
        DeviceType::Aircon,
        DeviceType::Vacuum,
        DeviceType::Kettle,
        DeviceType::Blinds,
        DeviceType::Plug,
        DeviceType::Fan,
        DeviceType::Heater,
        DeviceType::Lock,
        DeviceType::Camera,
        DeviceType::Speaker,
        DeviceType::Tv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Light => "light",
            DeviceType::Aircon => "aircon",
            DeviceType::Vacuum => "vacuum",
            DeviceType::Kettle => "kettle",
            DeviceType::Blinds => "blinds",
            DeviceType::Plug => "plug",
            DeviceType::Fan => "fan",
            DeviceType::Heater => "heater",
            DeviceType::Lock => "lock",
            DeviceType::Camera => "camera",
            DeviceType::Speaker => "speaker",
            DeviceType::Tv => "tv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeviceType::Light => "Light",
            DeviceType::Aircon => "Air Conditioner",
            DeviceType::Vacuum => "Vacuum Cleaner",
            DeviceType::Kettle => "Kettle",
            DeviceType::Blinds => "Blinds",
            DeviceType::Plug => "Smart Plug",
            DeviceType::Fan => "Fan",
            DeviceType::Heater => "Heater",
            DeviceType::Lock => "Smart Lock",
            DeviceType::Camera => "Security Camera",
            DeviceType::Speaker => "Smart Speaker",
            DeviceType::Tv => "Smart TV",
        }
    }

    pub fn default_icon(&self) -> &'static str {
        match self {
            DeviceType::Light => "💡",
            DeviceType::Aircon => "❄️",
            DeviceType::Vacuum => "🧹",
            DeviceType::Kettle => "☕",
            DeviceType::Blinds => "🪟",
            DeviceType::Plug => "🔌",
            DeviceType::Fan => "🌀",
            DeviceType::Heater => "🔥",
            DeviceType::Lock => "🔒",
            DeviceType::Camera => "📹",
            DeviceType::Speaker => "🔊",
            DeviceType::Tv => "📺",
        }
    }

    /// Label of the numeric setting, if the type has one.
    /// Temperature for aircon/heater, percentage for blinds/fan/speaker.
    pub fn value_label(&self) -> Option<&'static str> {
        match self {
            DeviceType::Aircon | DeviceType::Heater => Some("Temperature (°C)"),
            DeviceType::Blinds => Some("Position (%)"),
            DeviceType::Fan => Some("Speed (%)"),
            DeviceType::Speaker => Some("Volume (%)"),
            _ => None,
        }
    }

    /// Initial value given to a freshly onboarded device.
    pub fn default_value(&self) -> Option<f64> {
        match self {
            DeviceType::Aircon => Some(24.0),
            DeviceType::Blinds => Some(100.0),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: bool,
    #[serde(default)]
    pub value: Option<f64>,
    pub room: String,
    pub icon: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewDevice {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTypeInfo {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub name: &'static str,
    pub icon: &'static str,
    pub has_value: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_label: Option<&'static str>,
}

impl From<DeviceType> for DeviceTypeInfo {
    fn from(device_type: DeviceType) -> Self {
        Self {
            device_type,
            name: device_type.display_name(),
            icon: device_type.default_icon(),
            has_value: device_type.value_label().is_some(),
            value_label: device_type.value_label(),
        }
    }
}

// ============================================================================
// Automation rules
// ============================================================================

/// Condition descriptor as stored on a rule and produced by the rule parser.
/// It is only turned into a typed condition when evaluated or validated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default)]
    pub value: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    TurnOn,
    TurnOff,
    SetValue,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::TurnOn => "turnOn",
            ActionKind::TurnOff => "turnOff",
            ActionKind::SetValue => "setValue",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    pub device_id: String,
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AutomationRule {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub condition: ConditionSpec,
    pub actions: Vec<RuleAction>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_triggered_at: Option<DateTime<Utc>>,
}

/// A rule before it is stored: from manual input or the natural-language parser.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RuleDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub condition: ConditionSpec,
    #[serde(alias = "action")]
    pub actions: Vec<RuleAction>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RuleLog {
    pub id: u64,
    pub rule_id: i32,
    pub rule_name: String,
    pub executed_at: DateTime<Utc>,
    pub success: bool,
    pub message: String,
}

/// One exchange with the energy advisor
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Conversation {
    pub id: u64,
    pub user_message: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Electricity plans
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ElectricityPlan {
    pub id: i32,
    pub provider: String,
    pub plan_name: String,
    pub rate_per_kwh: f64,
    /// Months, 0 means no contract.
    pub contract_length: u32,
    pub renewable_percentage: f64,
    pub additional_fees: String,
    pub url: String,
}

/// A plan with its projected costs for one usage profile. Never stored.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlanComparison {
    #[serde(flatten)]
    pub plan: ElectricityPlan,
    pub monthly_cost: f64,
    pub annual_cost: f64,
    pub savings_vs_current: f64,
    pub savings_percentage: f64,
    pub recommendation_score: u8,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SwitchingSavings {
    pub current_annual_cost: f64,
    pub new_annual_cost: f64,
    pub annual_savings: f64,
    pub payback_period_months: u32,
}
