/// Deployment diagnostics
///
/// Reports configuration presence and route registration without ever
/// returning secret values.
use actix_web::{web, HttpResponse};
use serde_json::{json, Map, Value};

use crate::routes::{self, ROUTE_CATALOG};
use crate::services::diagnostics::{database_status, variable_report};
use crate::services::firebase::{self, FIREBASE_ENV_VARS};
use crate::state::AppState;

const ROUTE_GROUPS: [&str; 4] = ["system", "diagnostics", "websocket", "realtime"];

/// Endpoint: GET /diagnostics/routes
pub async fn routes_report() -> HttpResponse {
    let mut groups = Map::new();
    for group in ROUTE_GROUPS {
        let entries: Vec<Value> = routes::routes_in(group)
            .map(|r| json!({ "method": r.method, "path": r.path }))
            .collect();
        groups.insert(group.to_string(), Value::Array(entries));
    }

    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Route diagnostics",
        "routes": groups,
        "websocketRoute": routes::find("GET", "/ws"),
    }))
}

/// Endpoint: GET /diagnostics/firebase-env
pub async fn firebase_env(state: web::Data<AppState>) -> HttpResponse {
    let report = variable_report(&state.config);
    let firebase: Map<String, Value> = FIREBASE_ENV_VARS
        .iter()
        .filter_map(|name| report.get(name).map(|status| (name.to_string(), json!(status))))
        .collect();
    let all_present = FIREBASE_ENV_VARS
        .iter()
        .all(|name| report.get(name).is_some_and(|s| s.present));

    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Firebase environment check",
        "allVariablesPresent": all_present,
        "environmentVariables": firebase,
    }))
}

/// Endpoint: GET /diagnostics/comprehensive
pub async fn comprehensive(state: web::Data<AppState>) -> HttpResponse {
    let config = &state.config;
    let credentials = firebase::check_config(config);
    if !credentials.is_valid() {
        tracing::warn!(status = ?credentials, "firebase credentials not usable");
    }

    let mut route_counts = Map::new();
    for group in ROUTE_GROUPS {
        route_counts.insert(group.to_string(), json!(routes::routes_in(group).count()));
    }
    route_counts.insert("total".to_string(), json!(ROUTE_CATALOG.len()));

    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Comprehensive diagnostics completed",
        "diagnostics": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "environment": config.environment(),
            "serverStatus": "running",
            "environmentVariables": variable_report(config),
            "firebaseCredentials": credentials,
            "databaseConnection": database_status(config),
            "routes": route_counts,
            "realtime": {
                "registeredUsers": state.registry.len(),
                "openConnections": crate::metrics::open_connections(),
            },
        },
    }))
}

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/diagnostics")
            .route("/routes", web::get().to(routes_report))
            .route("/firebase-env", web::get().to(firebase_env))
            .route("/comprehensive", web::get().to(comprehensive)),
    );
}
