//! # Actix Middleware Library
//!
//! Shared middleware components for the LMS actix services
//!
//! ## Modules
//! - `rate_limit`: in-process, per-client-IP rate limiting scoped by path prefix
//! - `request_id`: `X-Request-ID` propagation

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{RateLimitConfig, RateLimitMiddleware, RateLimitRule};
pub use request_id::{RequestId, RequestIdMiddleware};
