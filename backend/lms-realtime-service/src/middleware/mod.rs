pub mod cors;
pub mod rate_limits;
pub mod service_auth;

pub use cors::OriginPolicy;
pub use service_auth::ServiceCaller;
