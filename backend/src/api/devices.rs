use crate::{
    error::Error,
    integrations,
    models::{DeviceType, DeviceTypeInfo, NewDevice},
    store::Store,
};
use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: bool,
}

#[derive(Deserialize)]
pub struct ValueRequest {
    pub value: f64,
}

/// List all devices, grouped by room
#[get("")]
pub async fn list_devices(store: web::Data<Store>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "devices": store.devices.list() }))
}

/// Supported device types for onboarding
#[get("/types")]
pub async fn device_types() -> HttpResponse {
    let types: Vec<DeviceTypeInfo> = DeviceType::ALL.into_iter().map(DeviceTypeInfo::from).collect();
    HttpResponse::Ok().json(json!({ "success": true, "deviceTypes": types }))
}

/// Scan for devices that could be onboarded. Nothing is added to the registry.
#[get("/discover")]
pub async fn discover_devices() -> HttpResponse {
    let discovered = integrations::discover_devices();
    log::info!("Device discovery found {} candidates", discovered.len());
    HttpResponse::Ok().json(json!({
        "success": true,
        "discovered": discovered,
        "message": "Device discovery completed. These devices can be added to your system."
    }))
}

#[get("/{device_id}")]
pub async fn get_device(
    store: web::Data<Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let device = store.devices.get(&path)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "device": device })))
}

#[post("")]
pub async fn add_device(
    store: web::Data<Store>,
    body: web::Json<NewDevice>,
) -> Result<HttpResponse, Error> {
    let device = store.devices.add(body.into_inner())?;
    log::info!("Added device '{}' ({})", device.id, device.device_type);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Device added successfully",
        "device": device
    })))
}

#[put("/{device_id}/status")]
pub async fn set_status(
    store: web::Data<Store>,
    path: web::Path<String>,
    body: web::Json<StatusRequest>,
) -> Result<HttpResponse, Error> {
    let device = store.devices.set_status(&path, body.status)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "device": device })))
}

#[put("/{device_id}/value")]
pub async fn set_value(
    store: web::Data<Store>,
    path: web::Path<String>,
    body: web::Json<ValueRequest>,
) -> Result<HttpResponse, Error> {
    let device = store.devices.set_value(&path, body.value)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "device": device })))
}

#[delete("/{device_id}")]
pub async fn delete_device(
    store: web::Data<Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let device = store.devices.delete(&path)?;
    log::info!("Deleted device '{}'", device.id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Device deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};
    use std::sync::Arc;

    fn app_data() -> web::Data<Store> {
        web::Data::from(Arc::new(Store::seeded(100, 0.3242)))
    }

    #[actix_rt::test]
    async fn test_list_and_get() {
        let app = test::init_service(
            App::new()
                .app_data(app_data())
                .configure(crate::api::config),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/devices").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["devices"].as_array().unwrap().len(), 3);

        let req = test::TestRequest::get().uri("/api/devices/ac1").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["device"]["type"], "aircon");

        let req = test::TestRequest::get().uri("/api/devices/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_types_not_shadowed_by_id_route() {
        let app = test::init_service(
            App::new()
                .app_data(app_data())
                .configure(crate::api::config),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/devices/types").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["deviceTypes"].as_array().unwrap().len(), 12);

        let req = test::TestRequest::get().uri("/api/devices/discover").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["discovered"].as_array().unwrap().len(), 2);
    }

    #[actix_rt::test]
    async fn test_add_device_and_conflict() {
        let app = test::init_service(
            App::new()
                .app_data(app_data())
                .configure(crate::api::config),
        )
        .await;

        let payload = json!({ "id": "blinds1", "name": "Bedroom Blinds", "type": "blinds", "room": "Bedroom" });
        let req = test::TestRequest::post()
            .uri("/api/devices")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/devices")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_rt::test]
    async fn test_status_and_value_updates() {
        let store = app_data();
        let app = test::init_service(
            App::new()
                .app_data(store.clone())
                .configure(crate::api::config),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/api/devices/vacuum1/status")
            .set_json(json!({ "status": true }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert!(store.devices.get("vacuum1").unwrap().status);

        let req = test::TestRequest::put()
            .uri("/api/devices/ac1/value")
            .set_json(json!({ "value": 22 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(store.devices.get("ac1").unwrap().value, Some(22.0));

        let req = test::TestRequest::delete().uri("/api/devices/ac1").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert!(store.devices.get("ac1").is_err());
    }
}
