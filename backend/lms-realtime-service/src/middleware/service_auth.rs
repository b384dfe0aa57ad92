//! Caller authentication for the internal notification API
//!
//! Collaborating services send `Authorization: Bearer <REALTIME_SERVICE_TOKEN>`.
//! Handlers take a [`ServiceCaller`] argument, so a request that fails the
//! check never reaches the handler body.

use actix_web::{dev::Payload, http::header, web, Error, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use crate::error::AppError;
use crate::state::AppState;

/// Proof that the request carried the configured service token
#[derive(Debug, Clone, Copy)]
pub struct ServiceCaller;

impl FromRequest for ServiceCaller {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authorize(req).map_err(Error::from))
    }
}

fn authorize(req: &HttpRequest) -> Result<ServiceCaller, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state is not configured".to_string()))?;

    let expected = state.config.service_token().ok_or_else(|| {
        AppError::Unauthorized("Realtime service API is disabled".to_string())
    })?;

    let presented = bearer_token(req)
        .ok_or_else(|| AppError::Unauthorized("Missing service token".to_string()))?;

    if constant_time_eq(presented.as_bytes(), expected.expose().as_bytes()) {
        Ok(ServiceCaller)
    } else {
        tracing::warn!(path = %req.path(), "rejected service token");
        Err(AppError::Unauthorized("Invalid service token".to_string()))
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Compares without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
