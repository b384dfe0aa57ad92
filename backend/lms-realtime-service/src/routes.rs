/// Route table for the gateway
///
/// `ROUTE_CATALOG` describes every route `configure` registers. The root
/// banner and the diagnostics endpoints are rendered from it.
use actix_middleware::{RateLimitMiddleware, RequestIdMiddleware};
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::Logger,
    web, App, Error,
};
use serde::Serialize;

use crate::error::{json_error_handler, AppError};
use crate::handlers::{diagnostics, realtime, socket, system};
use crate::metrics::MetricsMiddleware;
use crate::middleware::OriginPolicy;
use crate::state::AppState;

/// Upper bound on JSON request bodies
pub const JSON_BODY_LIMIT: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub name: &'static str,
    pub method: &'static str,
    pub path: &'static str,
    pub group: &'static str,
}

const fn route(
    name: &'static str,
    method: &'static str,
    path: &'static str,
    group: &'static str,
) -> RouteInfo {
    RouteInfo {
        name,
        method,
        path,
        group,
    }
}

pub const ROUTE_CATALOG: &[RouteInfo] = &[
    route("root", "GET", "/", "system"),
    route("health", "GET", "/health", "system"),
    route("testDeployment", "GET", "/test-deployment", "system"),
    route("metrics", "GET", "/metrics", "system"),
    route("diagnosticsRoutes", "GET", "/diagnostics/routes", "diagnostics"),
    route("diagnosticsFirebaseEnv", "GET", "/diagnostics/firebase-env", "diagnostics"),
    route("diagnosticsComprehensive", "GET", "/diagnostics/comprehensive", "diagnostics"),
    route("websocket", "GET", "/ws", "websocket"),
    route("realtimeUsers", "GET", "/internal/notifications/realtime/users", "realtime"),
    route("emitToUser", "POST", "/internal/notifications/realtime/users/{user_id}/events", "realtime"),
    route("emitLmsEvent", "POST", "/internal/notifications/realtime/users/{user_id}/lms-events", "realtime"),
    route("userPresence", "GET", "/internal/notifications/realtime/users/{user_id}/presence", "realtime"),
    route("broadcast", "POST", "/internal/notifications/realtime/broadcast", "realtime"),
    route("realtimeStats", "GET", "/internal/notifications/realtime/stats", "realtime"),
];

pub fn routes_in(group: &str) -> impl Iterator<Item = &'static RouteInfo> + '_ {
    ROUTE_CATALOG.iter().filter(move |r| r.group == group)
}

pub fn find(method: &str, path: &str) -> Option<&'static RouteInfo> {
    ROUTE_CATALOG
        .iter()
        .find(|r| r.method == method && r.path == path)
}

/// Mount every catalog route plus the JSON error mapping and 404 fallback.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(json_error_handler),
    )
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }));

    system::register_routes(cfg);
    diagnostics::register_routes(cfg);
    socket::register_routes(cfg);
    realtime::register_routes(cfg);

    cfg.default_service(web::to(system::not_found));
}

/// The gateway application with its full middleware stack.
///
/// `rate_limiter` is passed in rather than built here so every worker shares
/// the same buckets.
pub fn app(
    data: web::Data<AppState>,
    rate_limiter: RateLimitMiddleware,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let origins = OriginPolicy::new(data.config.origins());

    App::new()
        .app_data(data)
        .wrap(rate_limiter)
        .wrap(origins.cors())
        .wrap(RequestIdMiddleware)
        .wrap(MetricsMiddleware)
        .wrap(Logger::default())
        .configure(configure)
}
