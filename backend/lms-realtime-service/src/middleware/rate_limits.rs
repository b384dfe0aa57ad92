use actix_middleware::{RateLimitConfig, RateLimitMiddleware, RateLimitRule};

use crate::config::Config;

/// Rate limit rules for the public API. Every rule matching a request must
/// admit it.
pub fn api_rules() -> Vec<RateLimitRule> {
    let rules = [
        (
            vec!["/api/"],
            RateLimitConfig {
                max_requests: 500,
                window_seconds: 15 * 60,
                message: "Too many requests from this IP, please try again later.".to_string(),
            },
        ),
        (
            vec!["/api/auth/send-otp", "/api/auth/resend-otp"],
            RateLimitConfig {
                max_requests: 5,
                window_seconds: 60,
                message: "Too many OTP requests, please try again later.".to_string(),
            },
        ),
        (
            vec!["/api/auth/login", "/api/auth/register"],
            RateLimitConfig {
                max_requests: 10,
                window_seconds: 15 * 60,
                message: "Too many login attempts, please try again later.".to_string(),
            },
        ),
    ];

    rules
        .into_iter()
        .filter_map(|(prefixes, config)| RateLimitRule::new(prefixes, config))
        .collect()
}

pub fn build(config: &Config) -> RateLimitMiddleware {
    if config.rate_limit_enabled {
        RateLimitMiddleware::new(api_rules())
    } else {
        tracing::warn!("rate limiting disabled by RATE_LIMIT_ENABLED");
        RateLimitMiddleware::disabled()
    }
}
