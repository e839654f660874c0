use crate::integrations::{ForecastDay, WeatherReading};
use crate::services::round_to;
use chrono::NaiveDate;
use serde::Serialize;

/// Daily household consumption with no cooling load, in kWh.
const BASELINE_DAILY_KWH: f64 = 15.0;
/// Average temperature above which cooling adds load.
const COOLING_BASE_TEMPERATURE: f64 = 26.0;
const KWH_PER_DEGREE: f64 = 2.0;
const CORRELATION_RATE: f64 = 0.30;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Demand {
    Low,
    Medium,
    High,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnergyImpact {
    pub cooling_demand: Demand,
    pub heating_demand: Demand,
    pub natural_ventilation: bool,
    pub recommendation: &'static str,
}

/// How the current weather drives cooling and heating load (tropical thresholds).
pub fn energy_impact(weather: &WeatherReading) -> EnergyImpact {
    let t = weather.temperature;

    let cooling_demand = if t > 32.0 {
        Demand::High
    } else if t < 28.0 {
        Demand::Low
    } else {
        Demand::Medium
    };

    let heating_demand = if t < 15.0 {
        Demand::High
    } else if t < 20.0 {
        Demand::Medium
    } else {
        Demand::Low
    };

    let natural_ventilation =
        (24.0..=28.0).contains(&t) && weather.humidity < 70.0 && weather.wind_speed > 1.0;

    let recommendation = if cooling_demand == Demand::High {
        "High cooling demand. Consider pre-cooling during off-peak hours and using blinds to reduce solar heat gain."
    } else if cooling_demand == Demand::Low && natural_ventilation {
        "Perfect weather for natural ventilation. Turn off AC and open windows to save energy."
    } else if weather.humidity > 80.0 {
        "High humidity. Use dehumidifier mode on AC for better comfort and efficiency."
    } else {
        "Moderate conditions. Use fans and partial AC to optimize energy consumption."
    };

    EnergyImpact {
        cooling_demand,
        heating_demand,
        natural_ventilation,
        recommendation,
    }
}

/// Device actions worth automating under this weather, given the local hour (0-23).
pub fn automation_suggestions(weather: &WeatherReading, hour: u32) -> Vec<&'static str> {
    let mut suggestions = Vec::new();

    if weather.temperature > 30.0 {
        suggestions.push("Turn on AC and set to 24°C");
        suggestions.push("Close blinds to 50% to reduce heat");
    }

    if weather.temperature < 26.0 && weather.humidity < 60.0 {
        suggestions.push("Turn off AC and use natural ventilation");
        suggestions.push("Open blinds for natural lighting");
    }

    if weather.humidity > 80.0 {
        suggestions.push("Use AC in dehumidifier mode");
    }

    if (18..=22).contains(&hour) {
        suggestions.push("Turn on evening lights");
    }

    suggestions
}

/// Expected consumption for one forecast day
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnergyCorrelation {
    pub date: NaiveDate,
    pub temperature: f64,
    pub energy_consumption: f64,
    pub cost: f64,
}

/// Estimated daily kWh and cost per forecast day. Every degree of average
/// temperature above 26°C adds 2 kWh of cooling to a 15 kWh baseline.
pub fn weather_energy_correlation(forecast: &[ForecastDay]) -> Vec<EnergyCorrelation> {
    forecast
        .iter()
        .map(|day| {
            let avg = day.temperature.avg;
            let consumption = BASELINE_DAILY_KWH
                + ((avg - COOLING_BASE_TEMPERATURE) * KWH_PER_DEGREE).max(0.0);

            EnergyCorrelation {
                date: day.date,
                temperature: avg,
                energy_consumption: round_to(consumption, 1),
                cost: round_to(consumption * CORRELATION_RATE, 2),
            }
        })
        .collect()
}
