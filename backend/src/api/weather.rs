use crate::{
    config::Config,
    integrations::Integrations,
    integrations::ForecastDay,
    services::energy_impact::{automation_suggestions, energy_impact, weather_energy_correlation},
};
use actix_web::{HttpResponse, get, web};
use chrono::{Timelike, Utc};
use serde_json::json;

/// Current weather with its energy impact and suggested automations
#[get("/current")]
pub async fn current_weather(
    integrations: web::Data<Integrations>,
    config: web::Data<Config>,
) -> HttpResponse {
    let weather = match integrations.weather.current_weather().await {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to fetch weather: {}", e);
            return HttpResponse::BadGateway().json(json!({
                "success": false,
                "error": format!("Failed to fetch weather data: {}", e)
            }));
        }
    };

    let hour = Utc::now().with_timezone(&config.timezone).hour();

    HttpResponse::Ok().json(json!({
        "success": true,
        "energyImpact": energy_impact(&weather),
        "suggestions": automation_suggestions(&weather, hour),
        "weather": weather
    }))
}

/// Forecast days, or the 502 response to send when the provider has none
async fn fetch_forecast(integrations: &Integrations) -> Result<Vec<ForecastDay>, HttpResponse> {
    let error = match integrations.weather.forecast().await {
        Ok(days) if !days.is_empty() => return Ok(days),
        Ok(_) => "Failed to fetch forecast data: no forecast days returned".to_string(),
        Err(e) => format!("Failed to fetch forecast data: {}", e),
    };
    log::error!("{}", error);
    Err(HttpResponse::BadGateway().json(json!({ "success": false, "error": error })))
}

/// Daily forecast for the next five days
#[get("/forecast")]
pub async fn forecast(integrations: web::Data<Integrations>) -> HttpResponse {
    match fetch_forecast(&integrations).await {
        Ok(days) => HttpResponse::Ok().json(json!({ "success": true, "forecast": days })),
        Err(resp) => resp,
    }
}

/// Expected consumption and cost for each forecast day
#[get("/energy-correlation")]
pub async fn energy_correlation(integrations: web::Data<Integrations>) -> HttpResponse {
    match fetch_forecast(&integrations).await {
        Ok(days) => HttpResponse::Ok().json(json!({
            "success": true,
            "correlation": weather_energy_correlation(&days)
        })),
        Err(resp) => resp,
    }
}
