use super::{ForecastDay, ProviderError, TemperatureRange, WeatherProvider, WeatherReading};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use rand::Rng;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const CURRENT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";
const FORECAST_DAYS: usize = 5;

#[derive(Deserialize, Debug)]
struct OwmResponse {
    main: OwmMain,
    #[serde(default)]
    wind: Option<OwmWind>,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize, Debug)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Deserialize, Debug)]
struct OwmWind {
    speed: f64,
}

#[derive(Deserialize, Debug)]
struct OwmCondition {
    description: String,
}

impl OwmResponse {
    fn into_reading(self, fallback_city: &str) -> WeatherReading {
        WeatherReading {
            temperature: self.main.temp.round(),
            feels_like: self.main.feels_like.round(),
            humidity: self.main.humidity,
            wind_speed: self.wind.map(|w| w.speed).unwrap_or(0.0),
            description: self
                .weather
                .into_iter()
                .next()
                .map(|c| c.description)
                .unwrap_or_default(),
            city: if self.name.is_empty() {
                fallback_city.to_string()
            } else {
                self.name
            },
        }
    }
}

#[derive(Deserialize, Debug)]
struct OwmForecast {
    list: Vec<OwmForecastItem>,
}

/// One 3-hourly sample of the 5 day forecast
#[derive(Deserialize, Debug)]
struct OwmForecastItem {
    dt_txt: String,
    main: OwmForecastMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
}

#[derive(Deserialize, Debug)]
struct OwmForecastMain {
    temp: f64,
    humidity: f64,
}

/// Group samples by calendar day and keep the first [`FORECAST_DAYS`] days.
fn daily_forecast(items: Vec<OwmForecastItem>) -> Result<Vec<ForecastDay>, ProviderError> {
    let mut days: BTreeMap<NaiveDate, Vec<OwmForecastItem>> = BTreeMap::new();
    for item in items {
        let date = item
            .dt_txt
            .split(' ')
            .next()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or_else(|| {
                ProviderError::InvalidResponse(format!("bad forecast timestamp '{}'", item.dt_txt))
            })?;
        days.entry(date).or_default().push(item);
    }

    Ok(days
        .into_iter()
        .take(FORECAST_DAYS)
        .map(|(date, items)| {
            let count = items.len() as f64;
            let temps = items.iter().map(|i| i.main.temp);
            let min = temps.clone().fold(f64::INFINITY, f64::min);
            let max = temps.clone().fold(f64::NEG_INFINITY, f64::max);
            let avg = temps.sum::<f64>() / count;
            let humidity = items.iter().map(|i| i.main.humidity).sum::<f64>() / count;

            ForecastDay {
                date,
                temperature: TemperatureRange {
                    min: min.round(),
                    max: max.round(),
                    avg: avg.round(),
                },
                humidity: humidity.round(),
                description: items
                    .into_iter()
                    .next()
                    .and_then(|i| i.weather.into_iter().next())
                    .map(|c| c.description)
                    .unwrap_or_default(),
            }
        })
        .collect())
}

/// OpenWeatherMap current conditions and forecast, cached between calls
pub struct OpenWeatherProvider {
    client: reqwest::Client,
    api_key: String,
    city: String,
    cache_ttl: Duration,
    cache: Mutex<Option<(Instant, WeatherReading)>>,
    forecast_cache: Mutex<Option<(Instant, Vec<ForecastDay>)>>,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, city: String, cache_ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            city,
            cache_ttl,
            cache: Mutex::new(None),
            forecast_cache: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<WeatherReading, ProviderError> {
        let body: OwmResponse = self.get_json(CURRENT_WEATHER_URL).await?;
        Ok(body.into_reading(&self.city))
    }

    async fn fetch_forecast(&self) -> Result<Vec<ForecastDay>, ProviderError> {
        let body: OwmForecast = self.get_json(FORECAST_URL).await?;
        daily_forecast(body.list)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ProviderError> {
        let url = reqwest::Url::parse_with_params(
            endpoint,
            &[
                ("q", self.city.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ],
        )
        .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        let resp = self
            .client
            .get(url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => return Err(ProviderError::InvalidCredentials),
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            status if !status.is_success() => {
                return Err(ProviderError::ConnectionError(format!(
                    "OpenWeatherMap returned {}",
                    status
                )));
            }
            _ => {}
        }

        resp.json::<T>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn provider_name(&self) -> &'static str {
        "openweathermap"
    }

    async fn current_weather(&self) -> Result<WeatherReading, ProviderError> {
        let mut cache = self.cache.lock().await;
        if let Some((fetched_at, reading)) = cache.as_ref() {
            if fetched_at.elapsed() < self.cache_ttl {
                return Ok(reading.clone());
            }
        }

        let reading = self.fetch().await?;
        log::debug!(
            "Fetched weather for {}: {}°C, {}%",
            reading.city,
            reading.temperature,
            reading.humidity
        );
        *cache = Some((Instant::now(), reading.clone()));
        Ok(reading)
    }

    async fn forecast(&self) -> Result<Vec<ForecastDay>, ProviderError> {
        let mut cache = self.forecast_cache.lock().await;
        if let Some((fetched_at, days)) = cache.as_ref() {
            if fetched_at.elapsed() < self.cache_ttl {
                return Ok(days.clone());
            }
        }

        let days = self.fetch_forecast().await?;
        log::debug!("Fetched {}-day forecast for {}", days.len(), self.city);
        *cache = Some((Instant::now(), days.clone()));
        Ok(days)
    }
}

/// Random tropical readings for running without an API key
pub struct SimulatedWeather {
    city: String,
}

impl SimulatedWeather {
    pub fn new(city: String) -> Self {
        Self { city }
    }
}

#[async_trait]
impl WeatherProvider for SimulatedWeather {
    fn provider_name(&self) -> &'static str {
        "simulated"
    }

    async fn current_weather(&self) -> Result<WeatherReading, ProviderError> {
        let mut rng = rand::rng();
        let temperature = (rng.random_range(25.0..=35.0_f64) * 10.0).round() / 10.0;
        let humidity = rng.random_range(60.0..=90.0_f64).round();
        let wind_speed = (rng.random_range(0.5..=4.0_f64) * 10.0).round() / 10.0;

        Ok(WeatherReading {
            temperature,
            feels_like: temperature + 2.0,
            humidity,
            wind_speed,
            description: "simulated".to_string(),
            city: self.city.clone(),
        })
    }

    async fn forecast(&self) -> Result<Vec<ForecastDay>, ProviderError> {
        let mut rng = rand::rng();
        let today = Utc::now().date_naive();

        Ok((0..FORECAST_DAYS as u64)
            .map(|offset| {
                let min = rng.random_range(25.0..=28.0_f64).round();
                let max = rng.random_range(30.0..=35.0_f64).round();
                ForecastDay {
                    date: today + Days::new(offset),
                    temperature: TemperatureRange {
                        min,
                        max,
                        avg: ((min + max) / 2.0).round(),
                    },
                    humidity: rng.random_range(60.0..=90.0_f64).round(),
                    description: "simulated".to_string(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owm_response_mapping() {
        let body: OwmResponse = serde_json::from_str(
            r#"{
                "main": { "temp": 31.6, "feels_like": 37.2, "humidity": 74, "pressure": 1008 },
                "wind": { "speed": 3.1 },
                "weather": [ { "description": "scattered clouds", "icon": "03d" } ],
                "name": "Singapore"
            }"#,
        )
        .unwrap();

        let reading = body.into_reading("Fallback");
        assert_eq!(reading.temperature, 32.0);
        assert_eq!(reading.feels_like, 37.0);
        assert_eq!(reading.humidity, 74.0);
        assert_eq!(reading.wind_speed, 3.1);
        assert_eq!(reading.description, "scattered clouds");
        assert_eq!(reading.city, "Singapore");
    }

    #[test]
    fn test_owm_response_missing_optional_fields() {
        let body: OwmResponse = serde_json::from_str(
            r#"{ "main": { "temp": 27.0, "feels_like": 29.0, "humidity": 80 } }"#,
        )
        .unwrap();

        let reading = body.into_reading("Singapore");
        assert_eq!(reading.wind_speed, 0.0);
        assert_eq!(reading.description, "");
        assert_eq!(reading.city, "Singapore");
    }

    #[test]
    fn test_forecast_grouped_by_day() {
        let body: OwmForecast = serde_json::from_str(
            r#"{ "list": [
                { "dt_txt": "2024-06-01 09:00:00", "main": { "temp": 29.4, "humidity": 80 },
                  "weather": [ { "description": "light rain" } ] },
                { "dt_txt": "2024-06-01 12:00:00", "main": { "temp": 31.8, "humidity": 70 },
                  "weather": [ { "description": "few clouds" } ] },
                { "dt_txt": "2024-06-02 00:00:00", "main": { "temp": 26.2, "humidity": 88 } }
            ] }"#,
        )
        .unwrap();

        let days = daily_forecast(body.list).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(
            days[0].temperature,
            TemperatureRange {
                min: 29.0,
                max: 32.0,
                avg: 31.0
            }
        );
        assert_eq!(days[0].humidity, 75.0);
        assert_eq!(days[0].description, "light rain");
        assert_eq!(days[1].description, "");
    }

    #[test]
    fn test_forecast_keeps_five_days() {
        let items = (1..=7)
            .map(|day| OwmForecastItem {
                dt_txt: format!("2024-06-0{} 12:00:00", day),
                main: OwmForecastMain {
                    temp: 30.0,
                    humidity: 70.0,
                },
                weather: Vec::new(),
            })
            .collect();

        let days = daily_forecast(items).unwrap();
        assert_eq!(days.len(), 5);
        assert_eq!(days[4].date, NaiveDate::from_ymd_opt(2024, 6, 5).unwrap());
    }

    #[test]
    fn test_forecast_rejects_bad_timestamp() {
        let items = vec![OwmForecastItem {
            dt_txt: "tomorrow".to_string(),
            main: OwmForecastMain {
                temp: 30.0,
                humidity: 70.0,
            },
            weather: Vec::new(),
        }];
        assert!(matches!(
            daily_forecast(items),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[actix_rt::test]
    async fn test_simulated_forecast() {
        let days = SimulatedWeather::new("Singapore".to_string())
            .forecast()
            .await
            .unwrap();
        assert_eq!(days.len(), 5);
        assert!(days.windows(2).all(|w| w[0].date < w[1].date));
        assert!(days.iter().all(|d| d.temperature.min <= d.temperature.avg
            && d.temperature.avg <= d.temperature.max));
    }

    #[actix_rt::test]
    async fn test_simulated_weather_ranges() {
        let provider = SimulatedWeather::new("Singapore".to_string());
        for _ in 0..50 {
            let reading = provider.current_weather().await.unwrap();
            assert!((25.0..=35.0).contains(&reading.temperature));
            assert!((60.0..=90.0).contains(&reading.humidity));
            assert_eq!(reading.city, "Singapore");
        }
    }

    #[actix_rt::test]
    async fn test_cached_reading_is_reused() {
        let provider = OpenWeatherProvider::new(
            "unused".to_string(),
            "Singapore".to_string(),
            Duration::from_secs(600),
        );
        let cached = WeatherReading {
            temperature: 30.0,
            feels_like: 34.0,
            humidity: 70.0,
            wind_speed: 2.0,
            description: "clear sky".to_string(),
            city: "Singapore".to_string(),
        };
        *provider.cache.lock().await = Some((Instant::now(), cached.clone()));

        assert_eq!(provider.current_weather().await.unwrap(), cached);
    }
}
