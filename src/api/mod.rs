//! HTTP/WebSocket gateway for location-relay.
//!
//! The gateway plays the role of the messaging transport: peers register
//! with a display name, send commands and location samples, and collect
//! what the relay delivers to them.
//!
//! ## Endpoints
//!
//! ### Health & Info
//! - `GET /health` - Health check
//! - `GET /api/v1` - API information
//!
//! ### Events & Sessions
//! - `POST /api/v1/events` - Dispatch a structured event
//! - `GET /api/v1/sessions` - List active sessions
//!
//! ### Peers
//! - `POST /api/v1/peers` - Register a peer
//! - `DELETE /api/v1/peers/{id}` - Mark a peer unreachable
//! - `GET /api/v1/peers/{id}/inbox` - Drain pending deliveries
//! - `POST /api/v1/peers/{id}/commands` - Send a bot command as the peer
//! - `WS /api/v1/peers/{id}/ws` - Live deliveries and commands
//!
//! ## Example
//!
//! ```no_run
//! use location_relay::api::{ServerConfig, serve};
//!
//! #[tokio::main]
//! async fn main() -> location_relay::Result<()> {
//!     let config = ServerConfig::new("127.0.0.1", 3000);
//!     serve(config).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use handlers::AppState;
pub use router::{create_router, create_router_with_state, serve, serve_with_state, ServerConfig};
pub use types::{
    CommandRequest, ErrorResponse, InboxResponse, ListSessionsResponse, PeerResponse,
    RegisterPeerRequest, WsEvent, WsRequest,
};
