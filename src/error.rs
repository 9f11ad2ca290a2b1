//! Error types for location-relay.

use thiserror::Error;

use crate::peer::PeerId;
use crate::transport::DeliveryError;

/// Main error type for session and relay operations.
///
/// Every variant is recoverable: it is reported back to the requesting peer
/// and never tears down the session directory or the dispatcher.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The sender already has an outgoing session.
    #[error("peer {sender} is already sharing with {receiver}")]
    AlreadySharing { sender: PeerId, receiver: PeerId },

    /// The receiver text could not be parsed as a peer ID.
    #[error("invalid receiver id: {0:?}")]
    InvalidReceiverId(String),

    /// The sender named itself as the receiver.
    #[error("peer {0} cannot share with itself")]
    SelfShare(PeerId),

    /// The peer resolver does not know the receiver.
    #[error("receiver not found: {0}")]
    ReceiverNotFound(PeerId),

    /// A location sample arrived without an active session.
    #[error("no active session for sender {0}")]
    NoActiveSession(PeerId),

    /// Stop requested by a peer that neither sends nor receives.
    #[error("peer {0} is not sharing")]
    NotSharing(PeerId),

    /// Outbound delivery to a peer failed.
    #[error("delivery to {peer} failed: {source}")]
    DeliveryFailed {
        peer: PeerId,
        #[source]
        source: DeliveryError,
    },

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadySharing { .. } => "ALREADY_SHARING",
            Self::InvalidReceiverId(_) | Self::SelfShare(_) => "INVALID_RECEIVER_ID",
            Self::ReceiverNotFound(_) => "RECEIVER_NOT_FOUND",
            Self::NoActiveSession(_) => "NO_ACTIVE_SESSION",
            Self::NotSharing(_) => "NOT_SHARING",
            Self::DeliveryFailed { .. } => "DELIVERY_FAILED",
            Self::LockPoisoned | Self::Io(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this is a fault of the relay itself rather than of the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::LockPoisoned | Self::Io(_))
    }

    /// Whether this is an informational outcome rather than a failure.
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::NotSharing(_))
    }
}

/// Convenience Result type for location-relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
