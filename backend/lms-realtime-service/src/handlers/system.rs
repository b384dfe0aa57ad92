use actix_web::{web, HttpResponse};
use serde_json::{json, Map, Value};

use crate::error::{AppError, Result};
use crate::metrics;
use crate::routes::ROUTE_CATALOG;
use crate::services::diagnostics::database_status;
use crate::state::AppState;

pub const SERVICE_NAME: &str = "Aarambh LMS API Server";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Endpoint: GET /
pub async fn root() -> HttpResponse {
    let endpoints: Map<String, Value> = ROUTE_CATALOG
        .iter()
        .map(|r| (r.name.to_string(), json!(format!("{} {}", r.method, r.path))))
        .collect();

    HttpResponse::Ok().json(json!({
        "success": true,
        "message": SERVICE_NAME,
        "version": VERSION,
        "auth0Enabled": false,
        "endpoints": endpoints,
    }))
}

/// Endpoint: GET /health
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Server is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "databaseStatus": database_status(&state.config),
        "uptime": state.uptime_secs(),
        "realtime": {
            "registeredUsers": state.registry.len(),
            "openConnections": metrics::open_connections(),
        },
    }))
}

/// Endpoint: GET /test-deployment
pub async fn test_deployment() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Deployment test endpoint working",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": VERSION,
    }))
}

/// Fallback for unmatched routes
pub async fn not_found() -> Result<HttpResponse> {
    Err(AppError::NotFound("Endpoint not found".to_string()))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root))
        .route("/health", web::get().to(health))
        .route("/test-deployment", web::get().to(test_deployment))
        .route("/metrics", web::get().to(metrics::serve_metrics));
}
