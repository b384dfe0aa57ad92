use actix_cors::Cors;
use actix_web::http::header::HeaderValue;
use std::sync::Arc;

const LOCAL_PREFIXES: &[&str] = &[
    "http://localhost:",
    "http://127.0.0.1:",
    "https://localhost:",
    "https://127.0.0.1:",
];

/// Hosting platforms whose preview and production domains are trusted
const HOSTED_SUFFIXES: &[&str] = &[".vercel.app", ".netlify.app", ".amplifyapp.com", ".web.app"];

/// Origin allow-list plus the local-development and hosting-platform rules
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Arc<Vec<String>>,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>) -> Self {
        Self {
            allowed: Arc::new(allowed),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allowed.iter().any(|o| o == origin)
            || LOCAL_PREFIXES.iter().any(|p| origin.starts_with(p))
            || HOSTED_SUFFIXES.iter().any(|s| origin.ends_with(s))
    }

    /// actix-cors middleware applying this policy.
    ///
    /// Requests without an `Origin` header are not CORS requests and pass
    /// through untouched. A disallowed origin gets 400 before routing, which
    /// also covers the WebSocket upgrade.
    pub fn cors(&self) -> Cors {
        let policy = self.clone();
        Cors::default()
            .allowed_origin_fn(move |origin: &HeaderValue, _req| {
                origin.to_str().map(|o| policy.allows(o)).unwrap_or(false)
            })
            .allow_any_method()
            .allow_any_header()
            .expose_headers(["x-request-id"])
            .supports_credentials()
            .block_on_origin_mismatch(true)
            .max_age(3600)
    }
}
