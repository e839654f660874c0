use crate::services::automation_engine::AutomationEngine;
use actix_web::{HttpResponse, Responder, post, web};

/// Run one automation pass now instead of waiting for the scheduler
#[post("/run")]
pub async fn run_automation(engine: web::Data<AutomationEngine>) -> impl Responder {
    let results = engine.run().await;

    let summary = serde_json::json!({
        "success": true,
        "executed": results.len(),
        "successful": results.iter().filter(|r| r.success).count(),
        "failed": results.iter().filter(|r| !r.success).count(),
        "results": results
    });

    HttpResponse::Ok().json(summary)
}
