use crate::{
    error::Error,
    integrations::Integrations,
    models::RuleDraft,
    store::{RuleUpdate, Store},
};
use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;
use serde_json::json;

const DEFAULT_RULE_LOG_LIMIT: usize = 50;
const DEFAULT_ALL_LOG_LIMIT: usize = 100;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NaturalRuleRequest {
    #[serde(alias = "text")]
    pub user_input: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogExecutionRequest {
    pub rule_id: i32,
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

impl LogQuery {
    pub(crate) fn limit_or(&self, default: usize) -> usize {
        self.limit.filter(|l| *l > 0).unwrap_or(default)
    }
}

/// List all rules, newest first
#[get("")]
pub async fn list_rules(store: web::Data<Store>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "rules": store.rules.list() }))
}

#[get("/logs/all")]
pub async fn all_logs(store: web::Data<Store>, query: web::Query<LogQuery>) -> HttpResponse {
    let logs = store.rules.all_logs(query.limit_or(DEFAULT_ALL_LOG_LIMIT));
    HttpResponse::Ok().json(json!({ "success": true, "logs": logs }))
}

/// Create a rule from structured input
#[post("")]
pub async fn create_rule(
    store: web::Data<Store>,
    body: web::Json<RuleDraft>,
) -> Result<HttpResponse, Error> {
    let rule = store.rules.create(body.into_inner())?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Rule created successfully",
        "rule": rule
    })))
}

/// Create a rule from a plain-language description
#[post("/natural")]
pub async fn create_from_text(
    store: web::Data<Store>,
    integrations: web::Data<Integrations>,
    body: web::Json<NaturalRuleRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let text = body.user_input.trim();
    if text.is_empty() {
        return Err(Error::InvalidRule("userInput is required".to_string()).into());
    }

    let draft = integrations.rule_parser.parse_rule(text).await?;
    let rule = store.rules.create(draft)?;
    log::info!("Created rule {} from text: {}", rule.id, text);

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Rule created successfully",
        "rule": rule
    })))
}

/// Record an execution reported by a client
#[post("/logs")]
pub async fn log_execution(
    store: web::Data<Store>,
    body: web::Json<LogExecutionRequest>,
) -> Result<HttpResponse, Error> {
    let rule = store.rules.get(body.rule_id)?;
    let entry = store
        .rules
        .append_log(rule.id, &rule.name, body.success, body.message.clone());
    Ok(HttpResponse::Ok().json(json!({ "success": true, "log": entry })))
}

#[get("/{rule_id}")]
pub async fn get_rule(
    store: web::Data<Store>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let rule = store.rules.get(path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "rule": rule })))
}

#[put("/{rule_id}")]
pub async fn update_rule(
    store: web::Data<Store>,
    path: web::Path<i32>,
    body: web::Json<RuleUpdate>,
) -> Result<HttpResponse, Error> {
    let rule = store.rules.update(path.into_inner(), body.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "rule": rule })))
}

/// Toggle rule enabled/disabled
#[put("/{rule_id}/toggle")]
pub async fn toggle_rule(
    store: web::Data<Store>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let rule = store.rules.toggle(path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "rule": rule })))
}

#[delete("/{rule_id}")]
pub async fn delete_rule(
    store: web::Data<Store>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    store.rules.delete(path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Rule deleted successfully"
    })))
}

#[get("/{rule_id}/logs")]
pub async fn rule_logs(
    store: web::Data<Store>,
    path: web::Path<i32>,
    query: web::Query<LogQuery>,
) -> Result<HttpResponse, Error> {
    let logs = store
        .rules
        .logs_for(path.into_inner(), query.limit_or(DEFAULT_RULE_LOG_LIMIT))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "logs": logs })))
}
