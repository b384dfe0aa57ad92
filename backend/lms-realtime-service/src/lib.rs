pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod presence;
pub mod routes;
pub mod services;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, Result};
pub use presence::{EventFanout, PresenceRegistry, RealtimeNotifier};
pub use state::AppState;
