//! Inbound event handling.
//!
//! [`Dispatcher::dispatch`] is the per-event boundary: whatever happens while
//! handling one event (an expected error, an unexpected failure or a panic)
//! is logged and turned into a reply to the originating peer. The session
//! directory and the dispatcher itself stay usable for everyone else.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::peer::{LocationSample, PeerId};
use crate::relay::LocationRelay;
use crate::reply::{self, OutboundMessage};
use crate::session::{SessionManager, Stopped};
use crate::transport::{Outbound, PeerResolver, Transport};
use crate::Result;

/// An inbound event delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// `receiver` is the raw text the sender typed.
    StartShare { sender: PeerId, receiver: String },
    StopShare { requester: PeerId },
    Location {
        sender: PeerId,
        latitude: f64,
        longitude: f64,
    },
    WhoAmI { requester: PeerId },
    Start { requester: PeerId },
    Help { requester: PeerId },
    Menu { requester: PeerId },
}

impl Event {
    /// Peer that issued the event and receives the reply.
    pub fn origin(&self) -> PeerId {
        match self {
            Event::StartShare { sender, .. } | Event::Location { sender, .. } => *sender,
            Event::StopShare { requester }
            | Event::WhoAmI { requester }
            | Event::Start { requester }
            | Event::Help { requester }
            | Event::Menu { requester } => *requester,
        }
    }

    /// Parse a bot command such as `/share 200` sent by `peer`.
    ///
    /// A `@botname` suffix on the command word is ignored.
    pub fn from_command(peer: PeerId, text: &str) -> std::result::Result<Event, UnknownCommand> {
        let trimmed = text.trim();
        let (word, rest) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));
        let command = word.split('@').next().unwrap_or(word);

        let event = match command {
            "/start" => Event::Start { requester: peer },
            "/help" => Event::Help { requester: peer },
            "/menu" => Event::Menu { requester: peer },
            "/share" => Event::StartShare {
                sender: peer,
                receiver: rest.trim().to_string(),
            },
            "/stop" => Event::StopShare { requester: peer },
            "/whoami" => Event::WhoAmI { requester: peer },
            _ => return Err(UnknownCommand(trimmed.to_string())),
        };
        Ok(event)
    }
}

/// Text that is not a recognized bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl std::fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown command: {}", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub origin: PeerId,
    /// `OK`, or the error code of the failure.
    pub outcome: String,
    /// Reply addressed to the origin.
    pub reply: OutboundMessage,
    /// Whether the reply reached the origin.
    pub reply_delivered: bool,
}

impl DispatchReport {
    pub fn is_ok(&self) -> bool {
        self.outcome == "OK"
    }
}

/// Routes inbound events to the session manager and the location relay.
pub struct Dispatcher {
    sessions: Arc<SessionManager>,
    relay: LocationRelay,
    outbound: Outbound,
    web_url: String,
}

impl Dispatcher {
    pub fn new(sessions: Arc<SessionManager>, outbound: Outbound, web_url: impl Into<String>) -> Self {
        let relay = LocationRelay::new(Arc::clone(&sessions), outbound.clone());
        Self {
            sessions,
            relay,
            outbound,
            web_url: web_url.into(),
        }
    }

    /// Wire a dispatcher to a transport that also resolves peers.
    pub fn with_transport<T>(transport: Arc<T>, send_timeout: Duration, web_url: impl Into<String>) -> Self
    where
        T: Transport + PeerResolver + 'static,
    {
        let outbound = Outbound::new(transport.clone(), send_timeout);
        let sessions = Arc::new(SessionManager::new(transport, outbound.clone()));
        Self::new(sessions, outbound, web_url)
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Handle one event and reply to its origin. Never fails.
    pub async fn dispatch(&self, event: Event) -> DispatchReport {
        let origin = event.origin();
        debug!(%origin, ?event, "dispatching event");

        let handled = AssertUnwindSafe(self.handle(event)).catch_unwind().await;

        let (outcome, reply) = match handled {
            Ok(Ok(reply)) => ("OK".to_string(), reply),
            Ok(Err(e)) => {
                if e.is_internal() {
                    error!(%origin, error = %e, "event handling failed");
                } else if e.is_informational() {
                    debug!(%origin, code = e.code(), "{}", e);
                } else {
                    info!(%origin, code = e.code(), "{}", e);
                }
                (e.code().to_string(), reply::for_error(&e))
            }
            Err(panic) => {
                error!(%origin, panic = panic_message(&*panic), "event handler panicked");
                ("INTERNAL_ERROR".to_string(), reply::generic_failure())
            }
        };

        let reply_delivered = match self.outbound.message(origin, reply.clone()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%origin, error = %e, "reply not delivered");
                false
            }
        };

        DispatchReport {
            origin,
            outcome,
            reply,
            reply_delivered,
        }
    }

    /// Parse and dispatch a bot command; unknown text gets a usage reply.
    pub async fn dispatch_command(&self, peer: PeerId, text: &str) -> DispatchReport {
        match Event::from_command(peer, text) {
            Ok(event) => self.dispatch(event).await,
            Err(UnknownCommand(text)) => {
                let reply = reply::unknown_command(&text);
                let reply_delivered = self.outbound.message(peer, reply.clone()).await.is_ok();
                DispatchReport {
                    origin: peer,
                    outcome: "UNKNOWN_COMMAND".to_string(),
                    reply,
                    reply_delivered,
                }
            }
        }
    }

    async fn handle(&self, event: Event) -> Result<OutboundMessage> {
        match event {
            Event::StartShare { sender, receiver } => {
                let started = self.sessions.start_share(sender, &receiver).await?;
                Ok(reply::sharing_started(
                    started.receiver.id,
                    &started.receiver.display_name,
                ))
            }
            Event::StopShare { requester } => match self.sessions.stop_share(requester).await? {
                Stopped::Sharing { receiver, .. } => Ok(reply::sharing_stopped(receiver)),
                Stopped::Receiving { sender, .. } => Ok(reply::receiving_stopped(sender)),
            },
            Event::Location {
                sender,
                latitude,
                longitude,
            } => {
                let relayed = self
                    .relay
                    .relay_location(sender, LocationSample::new(latitude, longitude))
                    .await?;
                Ok(reply::location_relayed(relayed.receiver))
            }
            Event::WhoAmI { requester } => {
                let identity = self.sessions.who_am_i(requester).await;
                Ok(reply::identity(identity.peer, identity.display_name.as_deref()))
            }
            Event::Start { .. } => Ok(reply::greeting()),
            Event::Help { .. } => Ok(reply::help()),
            Event::Menu { .. } => Ok(reply::menu(&self.web_url)),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
