//! In-process transport with a peer registry and per-peer inboxes.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

use super::{DeliveryError, PeerResolver, ResolveError, Transport};
use crate::peer::{LocationSample, PeerId, PeerProfile};
use crate::reply::OutboundMessage;

/// Capacity of the live delivery feed.
const FEED_CAPACITY: usize = 256;

/// Pending deliveries kept per peer. The oldest are dropped first.
pub const INBOX_CAPACITY: usize = 64;

/// Something delivered to a peer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Message(OutboundMessage),
    Location(LocationSample),
}

/// A payload addressed to a peer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub to: PeerId,
    pub payload: Payload,
}

#[derive(Debug)]
struct PeerEntry {
    display_name: String,
    reachable: bool,
    inbox: VecDeque<Delivery>,
}

/// Transport and resolver backed by an in-memory peer registry.
///
/// Registered peers resolve to their display name. Deliveries to a peer are
/// appended to its inbox and published on a broadcast feed for live
/// subscribers. An inbox holds at most [`INBOX_CAPACITY`] deliveries.
/// Sending to an unknown or unreachable peer fails.
pub struct LoopbackTransport {
    peers: RwLock<HashMap<PeerId, PeerEntry>>,
    feed: broadcast::Sender<Delivery>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            peers: RwLock::new(HashMap::new()),
            feed,
        }
    }

    /// Register a peer, or rename and re-enable an existing one.
    ///
    /// Returns `true` if the peer was not known before.
    pub fn register(&self, peer: PeerId, display_name: impl Into<String>) -> bool {
        let display_name = display_name.into();
        let Ok(mut peers) = self.peers.write() else {
            return false;
        };

        match peers.get_mut(&peer) {
            Some(entry) => {
                entry.display_name = display_name;
                entry.reachable = true;
                false
            }
            None => {
                peers.insert(
                    peer,
                    PeerEntry {
                        display_name,
                        reachable: true,
                        inbox: VecDeque::new(),
                    },
                );
                true
            }
        }
    }

    /// Mark a peer reachable or not (e.g. the peer blocked the bot).
    ///
    /// Returns `false` if the peer is unknown.
    pub fn set_reachable(&self, peer: PeerId, reachable: bool) -> bool {
        self.peers
            .write()
            .ok()
            .and_then(|mut peers| {
                peers.get_mut(&peer).map(|entry| entry.reachable = reachable)
            })
            .is_some()
    }

    /// Check if a peer is registered.
    pub fn contains(&self, peer: PeerId) -> bool {
        self.peers
            .read()
            .map(|peers| peers.contains_key(&peer))
            .unwrap_or(false)
    }

    /// Copy of a peer's inbox without draining it.
    pub fn inbox(&self, peer: PeerId) -> Vec<Delivery> {
        self.peers
            .read()
            .ok()
            .and_then(|peers| peers.get(&peer).map(|entry| entry.inbox.iter().cloned().collect()))
            .unwrap_or_default()
    }

    /// Take all pending deliveries for a peer.
    pub fn drain(&self, peer: PeerId) -> Option<Vec<Delivery>> {
        self.peers
            .write()
            .ok()?
            .get_mut(&peer)
            .map(|entry| entry.inbox.drain(..).collect())
    }

    /// Subscribe to the live feed of all deliveries.
    pub fn subscribe(&self) -> broadcast::Receiver<Delivery> {
        self.feed.subscribe()
    }

    /// Get the number of registered peers.
    pub fn count(&self) -> usize {
        self.peers.read().map(|p| p.len()).unwrap_or(0)
    }

    fn deliver(&self, peer: PeerId, payload: Payload) -> Result<(), DeliveryError> {
        let delivery = Delivery { to: peer, payload };
        {
            let mut peers = self
                .peers
                .write()
                .map_err(|_| DeliveryError::Transport("peer registry poisoned".into()))?;

            match peers.get_mut(&peer) {
                Some(entry) if entry.reachable => {
                    if entry.inbox.len() == INBOX_CAPACITY {
                        entry.inbox.pop_front();
                    }
                    entry.inbox.push_back(delivery.clone());
                }
                _ => return Err(DeliveryError::Unreachable(peer)),
            }
        }

        // No live subscribers is fine; the inbox still holds the delivery.
        let _ = self.feed.send(delivery);
        Ok(())
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send_message(
        &self,
        peer: PeerId,
        message: OutboundMessage,
    ) -> Result<(), DeliveryError> {
        self.deliver(peer, Payload::Message(message))
    }

    async fn send_location(
        &self,
        peer: PeerId,
        sample: LocationSample,
    ) -> Result<(), DeliveryError> {
        self.deliver(peer, Payload::Location(sample))
    }
}

#[async_trait]
impl PeerResolver for LoopbackTransport {
    async fn resolve(&self, peer: PeerId) -> Result<PeerProfile, ResolveError> {
        let peers = self
            .peers
            .read()
            .map_err(|_| ResolveError::Transport("peer registry poisoned".into()))?;

        peers
            .get(&peer)
            .map(|entry| PeerProfile::new(peer, entry.display_name.clone()))
            .ok_or(ResolveError::NotFound(peer))
    }
}
