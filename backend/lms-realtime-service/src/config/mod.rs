/// Configuration management
///
/// Values come from the process environment (after loading `.env` when
/// present). Variable names are the upper-cased field names.
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::error::AppError;
use crate::websocket::HeartbeatConfig;

/// Origins allowed when `ALLOWED_ORIGINS` is not set
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5174",
    "http://localhost:3000",
    "http://localhost:5175",
    "http://localhost:5176",
    "http://localhost:5177",
    "http://127.0.0.1:5174",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5175",
    "http://127.0.0.1:5176",
    "http://127.0.0.1:5177",
    "https://aarambh-frontend.vercel.app",
    "https://aarambh-git-main-madantambisetty.vercel.app",
    "https://aarambh.vercel.app",
    "https://main.du547ljv1ya6v.amplifyapp.com",
    "https://aarambh-production.eba-hmkpyyve.us-east-1.elasticbeanstalk.com",
    "https://aarambh-01.web.app",
];

/// Credential or connection string that must never reach logs
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Preferred environment name; `NODE_ENV` is read as a fallback
    #[serde(default)]
    pub app_env: Option<String>,
    #[serde(default)]
    pub node_env: Option<String>,

    /// Comma-separated CORS allow-list
    #[serde(default)]
    pub allowed_origins: Option<String>,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    #[serde(default = "default_heartbeat_interval")]
    pub ws_heartbeat_interval_secs: u64,
    #[serde(default = "default_client_timeout")]
    pub ws_client_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub rate_limit_enabled: bool,

    /// Bearer token collaborating services present to the internal
    /// notification API. Unset disables that API.
    #[serde(default)]
    pub realtime_service_token: Option<Secret>,

    // Collaborator settings; only their presence is inspected here
    #[serde(default)]
    pub mongodb_uri: Option<Secret>,
    #[serde(default)]
    pub jwt_secret: Option<Secret>,
    #[serde(default)]
    pub firebase_project_id: Option<String>,
    #[serde(default)]
    pub firebase_client_email: Option<String>,
    #[serde(default)]
    pub firebase_private_key: Option<Secret>,
    #[serde(default)]
    pub gmail_user: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3002
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_heartbeat_interval() -> u64 {
    5
}

fn default_client_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let config: Config =
            envy::from_env().map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Build from explicit key/value pairs instead of the process environment
    pub fn from_vars<I>(vars: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config =
            envy::from_iter(vars).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.ws_heartbeat_interval_secs == 0 {
            return Err(AppError::Config(
                "WS_HEARTBEAT_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }
        if self.ws_client_timeout_secs <= self.ws_heartbeat_interval_secs {
            return Err(AppError::Config(
                "WS_CLIENT_TIMEOUT_SECS must be greater than WS_HEARTBEAT_INTERVAL_SECS"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn environment(&self) -> &str {
        self.app_env
            .as_deref()
            .or(self.node_env.as_deref())
            .filter(|e| !e.trim().is_empty())
            .unwrap_or("development")
    }

    pub fn is_production(&self) -> bool {
        self.environment() == "production"
    }

    pub fn origins(&self) -> Vec<String> {
        match &self.allowed_origins {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .collect(),
        }
    }

    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            interval: Duration::from_secs(self.ws_heartbeat_interval_secs),
            client_timeout: Duration::from_secs(self.ws_client_timeout_secs),
        }
    }

    pub fn service_token(&self) -> Option<&Secret> {
        self.realtime_service_token
            .as_ref()
            .filter(|token| !token.is_blank())
    }

    pub fn database_configured(&self) -> bool {
        self.mongodb_uri.as_ref().is_some_and(|s| !s.is_blank())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(Vec::new()).unwrap();
        assert_eq!(config.port, 3002);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.environment(), "development");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.rate_limit_enabled);
        assert_eq!(config.heartbeat().interval, Duration::from_secs(5));
        assert_eq!(config.heartbeat().client_timeout, Duration::from_secs(30));
        assert_eq!(config.origins().len(), DEFAULT_ALLOWED_ORIGINS.len());
        assert!(!config.database_configured());
        assert!(config.service_token().is_none());
    }

    #[test]
    fn test_blank_service_token_counts_as_unset() {
        let config = Config::from_vars(vars(&[("REALTIME_SERVICE_TOKEN", "  ")])).unwrap();
        assert!(config.service_token().is_none());

        let config = Config::from_vars(vars(&[("REALTIME_SERVICE_TOKEN", "s3cret")])).unwrap();
        assert_eq!(config.service_token().map(Secret::expose), Some("s3cret"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("PORT", "8080"),
            ("NODE_ENV", "production"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("LOG_FORMAT", "json"),
            ("RATE_LIMIT_ENABLED", "false"),
            ("MONGODB_URI", "mongodb://localhost/lms"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert!(config.is_production());
        assert_eq!(
            config.origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.rate_limit_enabled);
        assert!(config.database_configured());
    }

    #[test]
    fn test_app_env_wins_over_node_env() {
        let config = Config::from_vars(vars(&[
            ("APP_ENV", "staging"),
            ("NODE_ENV", "production"),
        ]))
        .unwrap();
        assert_eq!(config.environment(), "staging");
    }

    #[test]
    fn test_invalid_port_fails() {
        let err = Config::from_vars(vars(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_timeout_must_exceed_heartbeat() {
        let err = Config::from_vars(vars(&[
            ("WS_HEARTBEAT_INTERVAL_SECS", "10"),
            ("WS_CLIENT_TIMEOUT_SECS", "10"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let config = Config::from_vars(vars(&[("JWT_SECRET", "super-secret")])).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("REDACTED"));
    }
}
