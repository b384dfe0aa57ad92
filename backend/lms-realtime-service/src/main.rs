use actix_web::{web, HttpServer};
use anyhow::Context;
use lms_realtime_service::{
    config::Config,
    error::AppError,
    logging,
    middleware::rate_limits,
    routes::{self, ROUTE_CATALOG},
    state::AppState,
};
use std::time::Duration;

/// How often idle rate limit buckets are dropped
const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init_tracing(config.log_format);

    let bind_addr = config.bind_addr();
    let rate_limiter = rate_limits::build(&config);
    let rate_limit_rules = rate_limiter.rule_count();
    let state = AppState::new(config);
    let data = web::Data::new(state.clone());

    let sweeper = rate_limiter.clone();
    actix_rt::spawn(async move {
        let mut interval = actix_rt::time::interval(RATE_LIMIT_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            sweeper.retain_recent();
        }
    });

    let server = HttpServer::new(move || routes::app(data.clone(), rate_limiter.clone()))
        .bind(&bind_addr)
        .map_err(|e| AppError::StartServer(format!("bind {bind_addr}: {e}")))?
        .run();

    tracing::info!(
        environment = state.config.environment(),
        addr = %bind_addr,
        websocket = %format!("ws://{bind_addr}/ws"),
        rate_limit_rules,
        database = %lms_realtime_service::services::diagnostics::database_status(&state.config),
        "lms realtime gateway started"
    );
    for route in ROUTE_CATALOG {
        tracing::info!(group = route.group, "{} {}", route.method, route.path);
    }
    if state.config.service_token().is_none() {
        tracing::warn!(
            "REALTIME_SERVICE_TOKEN is not set; the internal notification API rejects every request"
        );
    }
    if let Some(gmail_user) = &state.config.gmail_user {
        tracing::info!(from = %gmail_user, "email service: gmail");
    }

    server.await.context("http server terminated with an error")?;

    tracing::info!(
        registered_users = state.registry.len(),
        "lms realtime gateway stopped"
    );
    Ok(())
}
