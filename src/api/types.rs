//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::dispatch::DispatchReport;
use crate::peer::PeerId;
use crate::session::Session;
use crate::transport::{Delivery, Payload};

/// Request to register a peer with the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPeerRequest {
    pub id: PeerId,
    /// Display name returned by peer resolution.
    pub name: String,
}

/// Response for peer registration.
#[derive(Debug, Clone, Serialize)]
pub struct PeerResponse {
    pub id: PeerId,
    pub name: String,
    /// Whether the peer was newly created.
    pub created: bool,
}

/// A bot command typed by a peer.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    pub text: String,
}

/// Pending deliveries drained from a peer's inbox.
#[derive(Debug, Clone, Serialize)]
pub struct InboxResponse {
    pub peer: PeerId,
    pub count: usize,
    pub deliveries: Vec<Delivery>,
}

impl InboxResponse {
    pub fn new(peer: PeerId, deliveries: Vec<Delivery>) -> Self {
        Self {
            peer,
            count: deliveries.len(),
            deliveries,
        }
    }
}

/// List sessions response.
#[derive(Debug, Clone, Serialize)]
pub struct ListSessionsResponse {
    /// Total number of active sessions.
    pub count: usize,
    pub sessions: Vec<SessionSummary>,
}

/// Brief session summary for listing.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub sender: PeerId,
    pub receiver: PeerId,
    pub age_seconds: f64,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            sender: session.sender,
            receiver: session.receiver,
            age_seconds: session.age.as_secs_f64(),
        }
    }
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "PEER_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn peer_not_found(peer: PeerId) -> Self {
        Self::new("PEER_NOT_FOUND", format!("Peer '{}' is not registered", peer))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }
}

/// Frames a WebSocket client sends on behalf of its peer.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsRequest {
    /// A bot command such as `/share 200`.
    Command { text: String },
    /// A live location sample.
    Location { latitude: f64, longitude: f64 },
    Ping,
}

/// Frames the gateway pushes to a WebSocket client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    /// Something was delivered to this peer.
    Delivery { payload: Payload },
    /// Outcome of a request sent on this socket.
    Report { report: DispatchReport },
    Error { code: String, message: String },
    Pong,
}

impl WsEvent {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::OutboundMessage;

    #[test]
    fn test_register_peer_request() {
        let req: RegisterPeerRequest = serde_json::from_str(r#"{"id": 200, "name": "Bob"}"#).unwrap();
        assert_eq!(req.id, PeerId::new(200));
        assert_eq!(req.name, "Bob");
    }

    #[test]
    fn test_ws_request_command() {
        let req: WsRequest =
            serde_json::from_str(r#"{"type": "command", "text": "/share 200"}"#).unwrap();
        assert!(matches!(req, WsRequest::Command { text } if text == "/share 200"));
    }

    #[test]
    fn test_ws_request_location() {
        let req: WsRequest =
            serde_json::from_str(r#"{"type": "location", "latitude": 41.0, "longitude": -8.0}"#)
                .unwrap();
        assert!(matches!(req, WsRequest::Location { latitude, .. } if latitude == 41.0));
    }

    #[test]
    fn test_ws_event_delivery() {
        let event = WsEvent::Delivery {
            payload: Payload::Message(OutboundMessage::text("hi")),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"delivery\""));
        assert!(json.contains("\"kind\":\"message\""));
    }

    #[test]
    fn test_error_response_serialization() {
        let err = ErrorResponse::peer_not_found(PeerId::new(9));
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("PEER_NOT_FOUND"));
        assert!(json.contains("'9'"));
    }
}
