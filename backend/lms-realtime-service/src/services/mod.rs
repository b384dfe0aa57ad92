/// Collaborator checks surfaced by the diagnostics endpoints
pub mod diagnostics;
pub mod firebase;

pub use firebase::{check_config as check_firebase, CredentialStatus};
