//! Start/stop protocol on top of the session directory.

use std::sync::Arc;

use tracing::{debug, info};

use super::{Session, SessionDirectory, ShareState};
use crate::error::RelayError;
use crate::peer::{PeerId, PeerProfile};
use crate::reply;
use crate::transport::{Notified, Outbound, PeerResolver};
use crate::Result;

/// A session that was just started.
#[derive(Debug, Clone, PartialEq)]
pub struct Started {
    pub sender: PeerId,
    pub receiver: PeerProfile,
    /// Whether the receiver was told about the new session.
    pub receiver_notified: Notified,
}

/// A session that was just ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Stopped {
    /// The requester was the sender.
    Sharing {
        sender: PeerId,
        receiver: PeerId,
        receiver_notified: Notified,
    },
    /// The requester was the receiver.
    Receiving {
        receiver: PeerId,
        sender: PeerId,
        sender_notified: Notified,
    },
}

/// Who the requester is, as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub peer: PeerId,
    pub display_name: Option<String>,
}

/// Owns the session directory and enforces one session per sender.
pub struct SessionManager {
    directory: SessionDirectory,
    resolver: Arc<dyn PeerResolver>,
    outbound: Outbound,
}

impl SessionManager {
    pub fn new(resolver: Arc<dyn PeerResolver>, outbound: Outbound) -> Self {
        Self {
            directory: SessionDirectory::new(),
            resolver,
            outbound,
        }
    }

    /// Current sharing state of a sender.
    pub fn state_of(&self, sender: PeerId) -> Result<ShareState> {
        Ok(match self.directory.lookup_by_sender(sender)? {
            Some(_) => ShareState::Sharing,
            None => ShareState::Idle,
        })
    }

    /// Receiver the sender is currently sharing with.
    pub fn receiver_of(&self, sender: PeerId) -> Result<Option<PeerId>> {
        self.directory.lookup_by_sender(sender)
    }

    /// All active sessions in creation order.
    pub fn sessions(&self) -> Result<Vec<Session>> {
        self.directory.snapshot()
    }

    /// Get the number of active sessions.
    pub fn active_sessions(&self) -> Result<usize> {
        self.directory.len()
    }

    /// Start sharing `sender`'s location with the peer named by `raw_receiver`.
    ///
    /// Rejects the request without replacing the target if the sender is
    /// already sharing. The receiver notification is best-effort.
    pub async fn start_share(&self, sender: PeerId, raw_receiver: &str) -> Result<Started> {
        let receiver: PeerId = raw_receiver.parse()?;
        if receiver == sender {
            return Err(RelayError::SelfShare(sender));
        }

        if let Some(existing) = self.directory.lookup_by_sender(sender)? {
            return Err(RelayError::AlreadySharing {
                sender,
                receiver: existing,
            });
        }

        let profile = self.resolver.resolve(receiver).await.map_err(|e| {
            debug!(%receiver, error = %e, "receiver resolution failed");
            RelayError::ReceiverNotFound(receiver)
        })?;

        // A concurrent start for the same sender may have won since the check above.
        self.directory.create(sender, receiver)?;
        info!(
            %sender,
            %receiver,
            from = ?ShareState::Idle,
            to = ?ShareState::Sharing,
            "location sharing started"
        );

        let receiver_notified = self
            .outbound
            .notify(receiver, reply::incoming_share(sender))
            .await;

        Ok(Started {
            sender,
            receiver: profile,
            receiver_notified,
        })
    }

    /// Stop the requester's outgoing session, or else one incoming session.
    ///
    /// A requester that is both a sender and a receiver stops its own
    /// outgoing session first. On the receiving side only the earliest
    /// sender is removed per call.
    pub async fn stop_share(&self, requester: PeerId) -> Result<Stopped> {
        if let Some(receiver) = self.directory.remove(requester)? {
            info!(
                sender = %requester,
                %receiver,
                from = ?ShareState::Sharing,
                to = ?ShareState::Idle,
                "location sharing stopped by sender"
            );
            let receiver_notified = self
                .outbound
                .notify(receiver, reply::sender_stopped(requester))
                .await;

            return Ok(Stopped::Sharing {
                sender: requester,
                receiver,
                receiver_notified,
            });
        }

        if let Some(sender) = self.directory.remove_by_receiver(requester)? {
            info!(
                %sender,
                receiver = %requester,
                "location sharing stopped by receiver"
            );
            let sender_notified = self
                .outbound
                .notify(sender, reply::receiver_stopped(requester))
                .await;

            return Ok(Stopped::Receiving {
                receiver: requester,
                sender,
                sender_notified,
            });
        }

        Err(RelayError::NotSharing(requester))
    }

    /// Echo the requester's own ID and, if known, display name.
    pub async fn who_am_i(&self, requester: PeerId) -> Identity {
        let display_name = self
            .resolver
            .resolve(requester)
            .await
            .ok()
            .map(|profile| profile.display_name);

        Identity {
            peer: requester,
            display_name,
        }
    }
}
