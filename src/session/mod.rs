//! Session management module.
//!
//! This module tracks who is sharing their location with whom: the
//! [`SessionDirectory`] holds the sender -> receiver table and the
//! [`SessionManager`] implements the start/stop protocol on top of it.

mod directory;
mod manager;
mod state;

pub use directory::{Session, SessionDirectory};
pub use manager::{Identity, SessionManager, Started, Stopped};
pub use state::ShareState;
