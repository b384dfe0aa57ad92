use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::presence::{EventFanout, PresenceRegistry, RealtimeNotifier};

/// Shared application state handed to every handler via `web::Data`
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: PresenceRegistry,
    pub notifier: Arc<dyn RealtimeNotifier>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = PresenceRegistry::new();
        let notifier = Arc::new(EventFanout::new(registry.clone()));
        Self {
            config: Arc::new(config),
            registry,
            notifier,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
