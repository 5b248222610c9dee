use std::str::FromStr;

use actix_web::{web, HttpResponse, Responder};
use common::error::ParseEnumError;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::error::ApiError;

mod customers;
mod dashboard;

#[actix_web::get("/health")]
async fn health_check() -> impl Responder {
    info!("Health check request arrived");
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check);
    customers::configure(cfg);
    dashboard::configure(cfg);
}

/// Parses an optional query parameter; missing or blank means the default.
fn parse_param<T>(name: &str, value: Option<&str>) -> Result<T, ApiError>
where
    T: FromStr<Err = ParseEnumError> + Default,
{
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(T::default()),
        Some(value) => value
            .parse()
            .map_err(|err: ParseEnumError| ApiError::BadRequest(format!("{}: {}", name, err))),
    }
}

fn success<T: Serialize>(status: actix_web::http::StatusCode, data: T) -> HttpResponse {
    HttpResponse::build(status).json(json!({
        "success": true,
        "data": data,
    }))
}
