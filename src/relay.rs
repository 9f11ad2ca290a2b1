//! Forwarding of location samples to the active receiver.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::RelayError;
use crate::peer::{LocationSample, PeerId};
use crate::reply;
use crate::session::SessionManager;
use crate::transport::Outbound;
use crate::Result;

/// A sample that reached its receiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relayed {
    pub sender: PeerId,
    pub receiver: PeerId,
    pub sample: LocationSample,
}

/// Relays a sender's latest location to whoever they share with.
///
/// Samples are forwarded once and never retained. A failed delivery leaves
/// the session in place so the receiver can pick up later samples once it
/// becomes reachable again.
pub struct LocationRelay {
    sessions: Arc<SessionManager>,
    outbound: Outbound,
}

impl LocationRelay {
    pub fn new(sessions: Arc<SessionManager>, outbound: Outbound) -> Self {
        Self { sessions, outbound }
    }

    pub async fn relay_location(&self, sender: PeerId, sample: LocationSample) -> Result<Relayed> {
        let receiver = self
            .sessions
            .receiver_of(sender)?
            .ok_or(RelayError::NoActiveSession(sender))?;

        let delivered = match self.outbound.location(receiver, sample).await {
            Ok(()) => {
                self.outbound
                    .message(receiver, reply::location_notice(sender, &sample))
                    .await
            }
            Err(e) => Err(e),
        };

        match delivered {
            Ok(()) => {
                debug!(%sender, %receiver, "location relayed");
                Ok(Relayed {
                    sender,
                    receiver,
                    sample,
                })
            }
            Err(source) => {
                warn!(%sender, %receiver, error = %source, "location relay failed");
                Err(RelayError::DeliveryFailed {
                    peer: receiver,
                    source,
                })
            }
        }
    }
}
