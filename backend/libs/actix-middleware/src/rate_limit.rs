//! Per-client rate limiting
//!
//! Each [`RateLimitRule`] owns a keyed token bucket (client IP -> bucket) and
//! applies to every request whose path falls under one of its prefixes.
//! A request must be admitted by every matching rule; the first rule that
//! rejects it decides the 429 message.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    http::header,
    Error, HttpResponse,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use serde::Deserialize;
use serde_json::json;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
    /// Body message returned with the 429
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 500,
            window_seconds: 900, // 15 minutes
            message: "Too many requests from this IP, please try again later.".to_string(),
        }
    }
}

impl RateLimitConfig {
    /// Token bucket equivalent of "`max_requests` per `window_seconds`":
    /// the full allowance is available as burst and refills evenly over the window.
    fn quota(&self) -> Option<Quota> {
        let burst = NonZeroU32::new(self.max_requests)?;
        let period = Duration::from_secs(self.window_seconds) / self.max_requests;
        Quota::with_period(period).map(|q| q.allow_burst(burst))
    }
}

/// A rate limit scoped to one or more path prefixes.
pub struct RateLimitRule {
    prefixes: Vec<String>,
    config: RateLimitConfig,
    limiter: KeyedLimiter,
}

impl RateLimitRule {
    /// Returns `None` when the config cannot produce a quota
    /// (zero requests or a zero-length window).
    pub fn new<I, P>(prefixes: I, config: RateLimitConfig) -> Option<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let quota = config.quota()?;
        Some(Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.into().trim_end_matches('/').to_string())
                .collect(),
            config,
            limiter: RateLimiter::keyed(quota),
        })
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Prefix match on whole path segments: `/api/auth/login` covers
    /// `/api/auth/login` and `/api/auth/login/...` but not `/api/auth/login-x`.
    pub fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|base| {
            path == base
                || path
                    .strip_prefix(base.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Consume one token for `key`. On rejection returns how long the client
    /// should wait before retrying.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.limiter
            .check_key(&key.to_string())
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }
}

/// Middleware factory. Cheap to clone; all clones share the same buckets,
/// so construct it once outside the `HttpServer::new` closure.
#[derive(Clone)]
pub struct RateLimitMiddleware {
    rules: Arc<Vec<RateLimitRule>>,
}

impl RateLimitMiddleware {
    pub fn new(rules: Vec<RateLimitRule>) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    /// A middleware that admits everything.
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Drop buckets that have fully refilled. Call periodically to keep
    /// memory bounded by the number of recently active clients.
    pub fn retain_recent(&self) {
        for rule in self.rules.iter() {
            rule.limiter.retain_recent();
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            rules: self.rules.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    rules: Arc<Vec<RateLimitRule>>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();
        let ip = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        for rule in self.rules.iter().filter(|rule| rule.matches(&path)) {
            if let Err(wait) = rule.check(&ip) {
                tracing::warn!(
                    ip = %ip,
                    path = %path,
                    max_requests = rule.config.max_requests,
                    window_seconds = rule.config.window_seconds,
                    "Rate limit exceeded"
                );
                let message = rule.config.message.clone();
                let response = HttpResponse::TooManyRequests()
                    .insert_header((header::RETRY_AFTER, wait.as_secs().max(1).to_string()))
                    .json(json!({
                        "success": false,
                        "message": message,
                    }));
                return Box::pin(async move {
                    Err(InternalError::from_response(message, response).into())
                });
            }
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(prefixes: &[&str], max_requests: u32) -> RateLimitRule {
        RateLimitRule::new(
            prefixes.iter().copied(),
            RateLimitConfig {
                max_requests,
                window_seconds: 60,
                message: "slow down".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_rate_limit_config_default() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 500);
        assert_eq!(config.window_seconds, 900);
    }

    #[test]
    fn test_zero_requests_has_no_quota() {
        let config = RateLimitConfig {
            max_requests: 0,
            ..RateLimitConfig::default()
        };
        assert!(RateLimitRule::new(["/api"], config).is_none());
    }

    #[test]
    fn test_zero_window_has_no_quota() {
        let config = RateLimitConfig {
            window_seconds: 0,
            ..RateLimitConfig::default()
        };
        assert!(RateLimitRule::new(["/api"], config).is_none());
    }

    #[test]
    fn test_prefix_matching_on_segments() {
        let rule = rule(&["/api/auth/login"], 10);
        assert!(rule.matches("/api/auth/login"));
        assert!(rule.matches("/api/auth/login/google"));
        assert!(!rule.matches("/api/auth/login-x"));
        assert!(!rule.matches("/api/auth"));
    }

    #[test]
    fn test_trailing_slash_prefix() {
        let rule = rule(&["/api/"], 10);
        assert!(rule.matches("/api"));
        assert!(rule.matches("/api/courses"));
        assert!(!rule.matches("/apiary"));
        assert!(!rule.matches("/health"));
    }

    #[test]
    fn test_bucket_exhausts_per_key() {
        let rule = rule(&["/api"], 2);
        assert!(rule.check("10.0.0.1").is_ok());
        assert!(rule.check("10.0.0.1").is_ok());
        let wait = rule.check("10.0.0.1").unwrap_err();
        assert!(wait <= Duration::from_secs(60));

        // Other clients have their own bucket
        assert!(rule.check("10.0.0.2").is_ok());
    }
}
