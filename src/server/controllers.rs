use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::server::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

// Liveness of the status API itself
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "OK".into(),
    })
}

// Latest complete snapshot of all providers
pub async fn get_providers(data: web::Data<AppState>) -> impl Responder {
    info!("Request for all provider statuses");
    let snapshot = data.monitor.snapshot();
    info!("Returning statuses for {} providers", snapshot.statuses.len());

    HttpResponse::Ok().json(snapshot)
}

// Status of one provider, matched case-insensitively
pub async fn get_provider(
    data: web::Data<AppState>,
    provider_name: web::Path<String>,
) -> impl Responder {
    let name = provider_name.into_inner();
    info!("Request for status of provider: {}", name);

    let snapshot = data.monitor.snapshot();
    match snapshot
        .statuses
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(&name))
    {
        Some(status) => HttpResponse::Ok().json(status),
        None => HttpResponse::NotFound().json(json!({
            "error": format!("Provider not found: {}", name)
        })),
    }
}

pub async fn get_summary(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.monitor.snapshot().summary())
}

// Kick off a refresh cycle unless one is already running
pub async fn refresh_providers(data: web::Data<AppState>) -> impl Responder {
    info!("Request to refresh provider statuses");

    if data.monitor.trigger_refresh() {
        HttpResponse::Accepted().json(json!({ "status": "started" }))
    } else {
        HttpResponse::Conflict().json(json!({ "status": "in_flight" }))
    }
}

pub async fn get_system_info(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(&data.system_info)
}
