use std::net::{SocketAddr, TcpListener};

use actix_web::{dev::ServerHandle, http::header, web, HttpServer};
use lms_realtime_service::{config::Config, middleware::rate_limits, routes, state::AppState};

pub const SERVICE_TOKEN: &str = "test-service-token";

#[allow(dead_code)]
pub fn test_state() -> AppState {
    test_state_with(Vec::new())
}

/// State whose config is built from `vars`. The service token is set unless
/// `vars` provides its own `REALTIME_SERVICE_TOKEN`.
pub fn test_state_with(vars: Vec<(&str, &str)>) -> AppState {
    let mut vars = vars
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<Vec<_>>();
    if !vars.iter().any(|(k, _)| k == "REALTIME_SERVICE_TOKEN") {
        vars.push((
            "REALTIME_SERVICE_TOKEN".to_string(),
            SERVICE_TOKEN.to_string(),
        ));
    }
    AppState::new(Config::from_vars(vars).expect("valid test config"))
}

/// Authorization header a collaborating service sends
#[allow(dead_code)]
pub fn service_auth() -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {SERVICE_TOKEN}"))
}

/// Real server on an ephemeral port running the same app as `main`
#[allow(dead_code)]
pub async fn start_server(state: AppState) -> std::io::Result<(SocketAddr, ServerHandle)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let rate_limiter = rate_limits::build(&state.config);
    let data = web::Data::new(state);

    let server = HttpServer::new(move || routes::app(data.clone(), rate_limiter.clone()))
        .workers(1)
        .listen(listener)?
        .run();

    let handle = server.handle();
    actix_rt::spawn(server);
    Ok((addr, handle))
}
