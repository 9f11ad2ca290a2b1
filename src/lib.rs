//! # location-relay
//!
//! Peer-to-peer location sharing relay for chat bots.
//!
//! A sender starts sharing with a receiver named only by its numeric peer
//! ID; each location sample the sender submits is then forwarded to that
//! receiver. Either side can end the session. Sessions live in memory only
//! and are gone after a restart.
//!
//! ## Features
//!
//! - **Session Directory**: one outgoing session per sender, serialized behind a single lock
//! - **Location Relay**: forwards the latest sample and a notice, never stores history
//! - **Transport seams**: [`Transport`] and [`PeerResolver`] traits with bounded sends
//! - **Gateway**: HTTP/WebSocket loopback transport for driving the relay
//!
//! Receiver IDs are not authenticated: anyone who knows a peer ID can name
//! it as a receiver.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use location_relay::{Dispatcher, Event, LoopbackTransport, PeerId, DEFAULT_SEND_TIMEOUT};
//!
//! #[tokio::main]
//! async fn main() {
//!     location_relay::logging::try_init().ok();
//!
//!     let transport = Arc::new(LoopbackTransport::new());
//!     transport.register(PeerId::new(100), "Alice");
//!     transport.register(PeerId::new(200), "Bob");
//!
//!     let dispatcher = Dispatcher::with_transport(transport, DEFAULT_SEND_TIMEOUT, "http://localhost:8000");
//!     let report = dispatcher
//!         .dispatch(Event::StartShare { sender: PeerId::new(100), receiver: "200".into() })
//!         .await;
//!
//!     println!("{}: {}", report.outcome, report.reply.text);
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod peer;
pub mod relay;
pub mod reply;
pub mod security;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use dispatch::{DispatchReport, Dispatcher, Event};
pub use error::{RelayError, Result};
pub use peer::{LocationSample, PeerId, PeerProfile};
pub use relay::{LocationRelay, Relayed};
pub use reply::{Affordance, OutboundMessage};
pub use session::{Session, SessionDirectory, SessionManager, ShareState, Started, Stopped};
pub use transport::{
    DeliveryError, LoopbackTransport, Notified, Outbound, PeerResolver, ResolveError, Transport,
    DEFAULT_SEND_TIMEOUT,
};
