//! Credential models shared by the refresh orchestrator and the authenticated client.

pub mod credentials;
pub mod secret;

pub use credentials::*;
pub use secret::*;
