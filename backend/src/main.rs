use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware, web};
use std::sync::Arc;

use smarthome::{
    api,
    config::Config,
    integrations::Integrations,
    services::{automation_engine::AutomationEngine, scheduler},
    store::Store,
};

#[get("/")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "Smart Home Backend",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(Store::seeded(config.rule_log_capacity, config.current_rate));
    let integrations = Integrations::from_config(&config);
    let engine = Arc::new(AutomationEngine::new(
        store.clone(),
        integrations.weather.clone(),
        config.timezone,
        config.automation_interval,
    ));

    let _scheduler = if config.automation_enabled {
        match scheduler::start_automation(engine.clone(), config.automation_interval).await {
            Ok(sched) => Some(sched),
            Err(e) => {
                log::error!("Failed to start automation scheduler: {}", e);
                None
            }
        }
    } else {
        log::info!("Automation scheduler disabled");
        None
    };

    let bind = (config.host.clone(), config.port);
    log::info!("Starting Smart Home Backend at http://{}:{}", bind.0, bind.1);

    let store = web::Data::from(store);
    let engine = web::Data::from(engine);
    let integrations = web::Data::new(integrations);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(api::json_config())
            .app_data(store.clone())
            .app_data(engine.clone())
            .app_data(integrations.clone())
            .app_data(config.clone())
            .service(health_check)
            .configure(api::config)
    })
    .bind(bind)?
    .run()
    .await
}
