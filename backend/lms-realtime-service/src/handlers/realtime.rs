/// Realtime notification API
///
/// Lets collaborating services push events to connected users after their
/// own writes complete. Offline users are not an error: the response just
/// reports `delivered: false`.
///
/// Mounted outside `/api/` so the public per-IP limits do not throttle
/// service traffic; every handler requires a [`ServiceCaller`].
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::metrics;
use crate::middleware::ServiceCaller;
use crate::models::{EventName, EventPayload, LmsEvent, UserId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EmitRequest {
    pub event: String,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl EmitRequest {
    fn validate(self) -> Result<(EventName, EventPayload)> {
        let event =
            EventName::parse(&self.event).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let payload = match self.payload {
            None | Some(Value::Null) => EventPayload::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(AppError::BadRequest(
                    "payload must be a JSON object".to_string(),
                ))
            }
        };
        Ok((event, payload))
    }
}

fn parse_user_id(raw: &str) -> Result<UserId> {
    UserId::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Endpoint: POST /internal/notifications/realtime/users/{user_id}/events
pub async fn emit_to_user(
    _caller: ServiceCaller,
    path: web::Path<String>,
    state: web::Data<AppState>,
    body: web::Json<EmitRequest>,
) -> Result<HttpResponse> {
    let user_id = parse_user_id(&path)?;
    let (event, payload) = body.into_inner().validate()?;

    let outcome = state
        .notifier
        .emit_to_user(&user_id, event.as_str(), payload);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "userId": user_id,
        "event": event,
        "delivered": outcome.is_delivered(),
        "outcome": outcome,
    })))
}

/// Endpoint: POST /internal/notifications/realtime/users/{user_id}/lms-events
pub async fn emit_lms_event(
    _caller: ServiceCaller,
    path: web::Path<String>,
    state: web::Data<AppState>,
    body: web::Json<LmsEvent>,
) -> Result<HttpResponse> {
    let user_id = parse_user_id(&path)?;
    let event = body.into_inner();

    let outcome = state.notifier.notify(&user_id, &event);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "userId": user_id,
        "event": event.name(),
        "delivered": outcome.is_delivered(),
        "outcome": outcome,
    })))
}

/// Endpoint: POST /internal/notifications/realtime/broadcast
pub async fn broadcast(
    _caller: ServiceCaller,
    state: web::Data<AppState>,
    body: web::Json<EmitRequest>,
) -> Result<HttpResponse> {
    let (event, payload) = body.into_inner().validate()?;
    let report = state.notifier.emit_broadcast(event.as_str(), payload);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "event": event,
        "recipients": report.attempted,
        "delivered": report.delivered,
        "failed": report.failed,
    })))
}

/// Endpoint: GET /internal/notifications/realtime/users/{user_id}/presence
pub async fn presence(
    _caller: ServiceCaller,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = parse_user_id(&path)?;
    let online = state.notifier.is_online(&user_id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "userId": user_id,
        "online": online,
    })))
}

/// Endpoint: GET /internal/notifications/realtime/users
pub async fn list_users(
    _caller: ServiceCaller,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut users = state.registry.registered_users();
    users.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": users.len(),
        "users": users,
    })))
}

/// Endpoint: GET /internal/notifications/realtime/stats
pub async fn stats(
    _caller: ServiceCaller,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "registeredUsers": state.registry.len(),
        "openConnections": metrics::open_connections(),
    })))
}

/// Path prefix of the internal notification API
pub const SCOPE: &str = "/internal/notifications/realtime";

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(SCOPE)
            .route("/users", web::get().to(list_users))
            .route("/users/{user_id}/events", web::post().to(emit_to_user))
            .route("/users/{user_id}/lms-events", web::post().to(emit_lms_event))
            .route("/users/{user_id}/presence", web::get().to(presence))
            .route("/broadcast", web::post().to(broadcast))
            .route("/stats", web::get().to(stats)),
    );
}
