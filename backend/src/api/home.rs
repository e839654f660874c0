use crate::{
    error::Error,
    store::{HomeStateUpdate, Store},
};
use actix_web::{HttpResponse, get, put, web};
use serde_json::json;

#[get("/state")]
pub async fn get_state(store: web::Data<Store>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "state": store.home.get() }))
}

/// Update occupancy and/or the current electricity price
#[put("/state")]
pub async fn update_state(
    store: web::Data<Store>,
    body: web::Json<HomeStateUpdate>,
) -> Result<HttpResponse, Error> {
    let state = store.home.update(body.into_inner())?;
    log::info!(
        "Home state updated: presence={}, price={}",
        state.presence,
        state.electricity_price
    );
    Ok(HttpResponse::Ok().json(json!({ "success": true, "state": state })))
}
