//! Gateway access control.
//!
//! An optional Bearer API key guards every gateway route except `/health`.
//! It authenticates the client driving the gateway, not individual peers:
//! any peer ID can still be named as a receiver.

pub mod auth;

pub use auth::{auth_middleware, ApiKeyStore, AuthConfig};
