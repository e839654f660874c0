use crate::error::Error;
use crate::integrations::{AdvisorError, ParseError};
use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};

pub mod advisor;
pub mod automation;
pub mod devices;
pub mod home;
pub mod plans;
pub mod rules;
pub mod weather;

pub fn config(cfg: &mut web::ServiceConfig) {
    // Device routes
    cfg.service(
        web::scope("/api/devices")
            .service(devices::list_devices)
            .service(devices::device_types)
            .service(devices::discover_devices)
            .service(devices::add_device)
            .service(devices::get_device)
            .service(devices::set_status)
            .service(devices::set_value)
            .service(devices::delete_device),
    );

    // Automation rules routes
    cfg.service(
        web::scope("/api/rules")
            .service(rules::list_rules)
            .service(rules::all_logs)
            .service(rules::create_rule)
            .service(rules::create_from_text)
            .service(rules::log_execution)
            .service(rules::get_rule)
            .service(rules::update_rule)
            .service(rules::toggle_rule)
            .service(rules::delete_rule)
            .service(rules::rule_logs),
    );

    // Electricity plan routes
    cfg.service(
        web::scope("/api/plans")
            .service(plans::refresh_plans)
            .service(plans::list_plans)
            .service(plans::compare)
            .service(plans::recommendations)
            .service(plans::statistics)
            .service(plans::switching_savings),
    );

    cfg.service(
        web::scope("/api/weather")
            .service(weather::current_weather)
            .service(weather::forecast)
            .service(weather::energy_correlation),
    );

    cfg.service(
        web::scope("/api/home")
            .service(home::get_state)
            .service(home::update_state),
    );

    // Energy advisor routes
    cfg.service(
        web::scope("/api/advisor")
            .service(advisor::chat)
            .service(advisor::recommendations)
            .service(advisor::unusual_consumption)
            .service(advisor::history)
            .service(advisor::insights),
    );

    // Automation engine routes
    cfg.service(web::scope("/api/automation").service(automation::run_automation));
}

fn error_body(message: String) -> serde_json::Value {
    serde_json::json!({ "success": false, "error": message })
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::PlanNotFound(_) | Error::DeviceNotFound(_) | Error::RuleNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Error::DeviceExists(_) => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(error_body(self.to_string()))
    }
}

impl ResponseError for ParseError {
    fn status_code(&self) -> StatusCode {
        match self {
            ParseError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ParseError::Request(_) => StatusCode::BAD_GATEWAY,
            ParseError::InvalidResponse(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(error_body(self.to_string()))
    }
}

impl ResponseError for AdvisorError {
    fn status_code(&self) -> StatusCode {
        match self {
            AdvisorError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            AdvisorError::Request(_) | AdvisorError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(error_body(self.to_string()))
    }
}

/// Treat a JSON body that fails to deserialize as a 400 with the same error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(error_body(err.to_string()));
        actix_web::error::InternalError::from_response(err, response).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(Error::PlanNotFound(9).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::DeviceExists("ac1".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::UnsupportedOperator("!=".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::InvalidUsageValue {
                field: "monthlyUsage",
                value: 0.0
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ParseError::Unavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AdvisorError::Unavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AdvisorError::InvalidResponse("not json".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(Error::EmptyMessage.status_code(), StatusCode::BAD_REQUEST);
    }
}
