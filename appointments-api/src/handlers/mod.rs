pub mod appointments;

use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

use crate::database::Database;

pub async fn health(db: web::Data<Arc<Database>>) -> impl Responder {
    match db.ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "database": "connected"
        })),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "status": "unhealthy",
                "database": "disconnected"
            }))
        }
    }
}

pub const APPOINTMENTS_PATH: &str = "/api/ghl-appointments";

/// Permissive CORS; preflights are answered here.
pub fn cors() -> actix_cors::Cors {
    actix_cors::Cors::permissive().max_age(3600)
}

/// CORS headers for responses to requests that carry no `Origin`.
pub fn cors_headers() -> actix_web::middleware::DefaultHeaders {
    actix_web::middleware::DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add((
            "Access-Control-Allow-Headers",
            "authorization, x-client-info, apikey, content-type",
        ))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route(APPOINTMENTS_PATH, web::post().to(appointments::handle_appointments))
        .route(
            APPOINTMENTS_PATH,
            web::method(actix_web::http::Method::OPTIONS).to(appointments::preflight),
        );
}
