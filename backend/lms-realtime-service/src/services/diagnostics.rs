use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::Config;

/// Presence of one environment variable, value withheld
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableStatus {
    pub present: bool,
    pub value: Option<&'static str>,
}

impl VariableStatus {
    fn of(present: bool) -> Self {
        Self {
            present,
            value: present.then_some("[REDACTED]"),
        }
    }
}

/// Which of the collaborator variables are set. Keyed by variable name.
pub fn variable_report(config: &Config) -> BTreeMap<&'static str, VariableStatus> {
    let set = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());

    BTreeMap::from([
        (
            "FIREBASE_PROJECT_ID",
            VariableStatus::of(set(config.firebase_project_id.as_deref())),
        ),
        (
            "FIREBASE_CLIENT_EMAIL",
            VariableStatus::of(set(config.firebase_client_email.as_deref())),
        ),
        (
            "FIREBASE_PRIVATE_KEY",
            VariableStatus::of(set(config.firebase_private_key.as_ref().map(|s| s.expose()))),
        ),
        (
            "MONGODB_URI",
            VariableStatus::of(set(config.mongodb_uri.as_ref().map(|s| s.expose()))),
        ),
        (
            "JWT_SECRET",
            VariableStatus::of(set(config.jwt_secret.as_ref().map(|s| s.expose()))),
        ),
    ])
}

pub fn database_status(config: &Config) -> &'static str {
    if config.database_configured() {
        "configured"
    } else {
        "not_configured"
    }
}
