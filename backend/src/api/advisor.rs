use crate::{
    api::rules::LogQuery,
    error::Error,
    integrations::{AdvisorContext, ChatTurn, Integrations},
    services::advisor::{analyze_consumption, energy_insights},
    store::Store,
};
use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use serde_json::json;

const DEFAULT_HISTORY_LIMIT: usize = 20;
const DEFAULT_CURRENT_USAGE_KWH: f64 = 25.0;
const DEFAULT_HISTORICAL_AVERAGE_KWH: f64 = 18.0;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageQuery {
    pub current_usage: Option<f64>,
    pub historical_average: Option<f64>,
}

async fn advisor_context(store: &Store, integrations: &Integrations) -> AdvisorContext {
    let weather = match integrations.weather.current_weather().await {
        Ok(reading) => Some(reading),
        Err(e) => {
            log::warn!("Advisor context without weather: {}", e);
            None
        }
    };

    AdvisorContext {
        devices: store.devices.list(),
        weather,
        home: store.home.get(),
    }
}

/// Ask the energy advisor a question. The exchange is kept in the history.
#[post("/chat")]
pub async fn chat(
    store: web::Data<Store>,
    integrations: web::Data<Integrations>,
    body: web::Json<ChatRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let request = body.into_inner();
    let message = request.message.trim();
    if message.is_empty() {
        return Err(Error::EmptyMessage.into());
    }

    let context = advisor_context(&store, &integrations).await;
    let response = integrations
        .advisor
        .chat(message, &request.conversation_history, &context)
        .await?;

    store.conversations.append(message, &response);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "response": response })))
}

#[get("/recommendations")]
pub async fn recommendations(
    store: web::Data<Store>,
    integrations: web::Data<Integrations>,
) -> Result<HttpResponse, actix_web::Error> {
    let context = advisor_context(&store, &integrations).await;
    let recommendations = integrations.advisor.recommendations(&context).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "recommendations": recommendations })))
}

/// Check consumption against the usual level (defaults: 25 kWh against 18 kWh)
#[get("/unusual")]
pub async fn unusual_consumption(
    store: web::Data<Store>,
    integrations: web::Data<Integrations>,
    query: web::Query<UsageQuery>,
) -> Result<HttpResponse, Error> {
    let analysis = analyze_consumption(
        integrations.advisor.as_ref(),
        query.current_usage.unwrap_or(DEFAULT_CURRENT_USAGE_KWH),
        query.historical_average.unwrap_or(DEFAULT_HISTORICAL_AVERAGE_KWH),
        &store.devices.list(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "analysis": analysis })))
}

/// Past exchanges, newest first
#[get("/history")]
pub async fn history(store: web::Data<Store>, query: web::Query<LogQuery>) -> HttpResponse {
    let conversations = store
        .conversations
        .recent(query.limit_or(DEFAULT_HISTORY_LIMIT));
    HttpResponse::Ok().json(json!({ "success": true, "conversations": conversations }))
}

#[get("/insights")]
pub async fn insights(store: web::Data<Store>) -> HttpResponse {
    let insights = energy_insights(
        &store.devices.list(),
        &store.rules.list(),
        &store.rules.all_logs(usize::MAX),
        &store.home.get(),
    );
    HttpResponse::Ok().json(json!({ "success": true, "insights": insights }))
}
