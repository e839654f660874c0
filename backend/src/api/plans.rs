use crate::{
    error::Error,
    services::{
        plan_catalog::plan_statistics,
        plan_scorer::{
            self, DEFAULT_CURRENT_RATE, DEFAULT_MONTHLY_USAGE_KWH, PlanPreferences,
        },
    },
    store::Store,
};
use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use serde_json::json;

/// Query parameters shared by the comparison endpoints. Absent values take the defaults.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlanQuery {
    pub monthly_usage: Option<f64>,
    pub current_rate: Option<f64>,
    pub prefer_renewable: Option<bool>,
    pub max_contract_length: Option<u32>,
    pub prioritize_savings: Option<bool>,
}

impl PlanQuery {
    fn monthly_usage(&self) -> f64 {
        self.monthly_usage.unwrap_or(DEFAULT_MONTHLY_USAGE_KWH)
    }

    fn current_rate(&self) -> f64 {
        self.current_rate.unwrap_or(DEFAULT_CURRENT_RATE)
    }

    fn preferences(&self) -> PlanPreferences {
        PlanPreferences {
            prefer_renewable: self.prefer_renewable.unwrap_or(false),
            max_contract_length: self.max_contract_length,
            prioritize_savings: self.prioritize_savings.unwrap_or(false),
        }
    }
}

/// Reload the plan catalog
#[post("/refresh")]
pub async fn refresh_plans(store: web::Data<Store>) -> HttpResponse {
    let count = store.plans.refresh();
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Successfully refreshed {} electricity plans", count),
        "count": count
    }))
}

/// All plans, cheapest first
#[get("")]
pub async fn list_plans(store: web::Data<Store>) -> HttpResponse {
    let plans = store.plans.all();
    HttpResponse::Ok().json(json!({ "success": true, "count": plans.len(), "plans": plans }))
}

#[get("/compare")]
pub async fn compare(
    store: web::Data<Store>,
    query: web::Query<PlanQuery>,
) -> Result<HttpResponse, Error> {
    let (usage, rate, preferences) = (query.monthly_usage(), query.current_rate(), query.preferences());
    let comparisons = store
        .plans
        .with_plans(|plans| plan_scorer::compare_plans(plans, usage, rate, &preferences))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "comparisons": comparisons,
        "parameters": {
            "monthlyUsage": usage,
            "currentRate": rate,
            "preferences": preferences
        }
    })))
}

#[get("/recommendations")]
pub async fn recommendations(
    store: web::Data<Store>,
    query: web::Query<PlanQuery>,
) -> Result<HttpResponse, Error> {
    let (usage, rate, preferences) = (query.monthly_usage(), query.current_rate(), query.preferences());
    let recommendations = store
        .plans
        .with_plans(|plans| plan_scorer::recommend_plans(plans, usage, rate, &preferences))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "recommendations": recommendations,
        "parameters": {
            "monthlyUsage": usage,
            "currentRate": rate,
            "preferences": preferences
        }
    })))
}

#[get("/statistics")]
pub async fn statistics(store: web::Data<Store>) -> HttpResponse {
    match store.plans.with_plans(plan_statistics) {
        Some(statistics) => {
            HttpResponse::Ok().json(json!({ "success": true, "statistics": statistics }))
        }
        None => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": "No electricity plans loaded"
        })),
    }
}

#[get("/{plan_id}/savings")]
pub async fn switching_savings(
    store: web::Data<Store>,
    path: web::Path<i32>,
    query: web::Query<PlanQuery>,
) -> Result<HttpResponse, Error> {
    let plan_id = path.into_inner();
    let (usage, rate) = (query.monthly_usage(), query.current_rate());
    let savings = store
        .plans
        .with_plans(|plans| plan_scorer::switching_savings(plans, usage, rate, plan_id))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "savings": savings,
        "parameters": {
            "monthlyUsage": usage,
            "currentRate": rate
        }
    })))
}
