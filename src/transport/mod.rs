//! Messaging transport and peer resolution seams.
//!
//! The session manager and location relay only talk to the outside world
//! through the [`Transport`] and [`PeerResolver`] traits. [`Outbound`] wraps
//! a transport and bounds every send with a timeout, so a slow peer is
//! reported as a failed delivery instead of stalling the caller.
//!
//! [`LoopbackTransport`] is an in-process implementation of both traits
//! backing the HTTP/WebSocket gateway and the tests.

mod loopback;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::peer::{LocationSample, PeerId, PeerProfile};
use crate::reply::OutboundMessage;

pub use loopback::{Delivery, LoopbackTransport, Payload, INBOX_CAPACITY};

/// Default bound for a single outbound send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure to deliver an outbound message or location.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeliveryError {
    /// Peer is unknown to the transport or has blocked the bot.
    #[error("peer {0} is unreachable")]
    Unreachable(PeerId),

    /// The send did not complete within the configured bound.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    /// Any other transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Failure to resolve a peer ID.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("peer {0} not found")]
    NotFound(PeerId),

    #[error("resolver error: {0}")]
    Transport(String),
}

/// Outbound side of the messaging transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message, optionally with a reply affordance.
    async fn send_message(
        &self,
        peer: PeerId,
        message: OutboundMessage,
    ) -> Result<(), DeliveryError>;

    /// Send a location pin.
    async fn send_location(
        &self,
        peer: PeerId,
        sample: LocationSample,
    ) -> Result<(), DeliveryError>;
}

/// Turns a peer ID into a display name, or reports that it does not exist.
#[async_trait]
pub trait PeerResolver: Send + Sync {
    async fn resolve(&self, peer: PeerId) -> Result<PeerProfile, ResolveError>;
}

/// Result of a best-effort notification.
///
/// Carried inside successful outcomes so callers may ignore it while the
/// delivery status stays observable.
#[derive(Debug, Clone, PartialEq)]
pub enum Notified {
    Delivered,
    Failed(DeliveryError),
}

impl Notified {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Notified::Delivered)
    }
}

impl From<Result<(), DeliveryError>> for Notified {
    fn from(result: Result<(), DeliveryError>) -> Self {
        match result {
            Ok(()) => Notified::Delivered,
            Err(e) => Notified::Failed(e),
        }
    }
}

/// Transport handle with a per-send timeout.
#[derive(Clone)]
pub struct Outbound {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl Outbound {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Send a message, treating timeout expiry as a delivery failure.
    pub async fn message(
        &self,
        peer: PeerId,
        message: OutboundMessage,
    ) -> Result<(), DeliveryError> {
        tokio::time::timeout(self.timeout, self.transport.send_message(peer, message))
            .await
            .map_err(|_| DeliveryError::Timeout(self.timeout))?
    }

    /// Send a location, treating timeout expiry as a delivery failure.
    pub async fn location(
        &self,
        peer: PeerId,
        sample: LocationSample,
    ) -> Result<(), DeliveryError> {
        tokio::time::timeout(self.timeout, self.transport.send_location(peer, sample))
            .await
            .map_err(|_| DeliveryError::Timeout(self.timeout))?
    }

    /// Best-effort notification: failures are logged and returned as data.
    pub async fn notify(&self, peer: PeerId, message: OutboundMessage) -> Notified {
        let result = self.message(peer, message).await;
        if let Err(ref e) = result {
            tracing::warn!(%peer, error = %e, "notification not delivered");
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StalledTransport;

    #[async_trait]
    impl Transport for StalledTransport {
        async fn send_message(&self, _: PeerId, _: OutboundMessage) -> Result<(), DeliveryError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }

        async fn send_location(&self, _: PeerId, _: LocationSample) -> Result<(), DeliveryError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_send_timeout_is_delivery_failure() {
        let outbound = Outbound::new(Arc::new(StalledTransport), Duration::from_millis(20));

        let err = outbound
            .message(PeerId::new(1), OutboundMessage::text("hi"))
            .await
            .unwrap_err();
        assert_eq!(err, DeliveryError::Timeout(Duration::from_millis(20)));

        let err = outbound
            .location(PeerId::new(1), LocationSample::new(0.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_notify_reports_failure_as_data() {
        let outbound = Outbound::new(Arc::new(StalledTransport), Duration::from_millis(10));
        let notified = outbound
            .notify(PeerId::new(1), OutboundMessage::text("hi"))
            .await;
        assert!(!notified.is_delivered());
    }

    #[test]
    fn test_notified_from_result() {
        assert_eq!(Notified::from(Ok(())), Notified::Delivered);
        let failed = Notified::from(Err(DeliveryError::Unreachable(PeerId::new(5))));
        assert!(matches!(failed, Notified::Failed(DeliveryError::Unreachable(_))));
    }
}
