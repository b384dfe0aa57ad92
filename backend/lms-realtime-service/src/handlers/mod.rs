/// HTTP handlers for the realtime gateway
pub mod diagnostics;
pub mod realtime;
pub mod socket;
pub mod system;
