//! Outbound message texts and reply affordances.

use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::peer::{LocationSample, PeerId};

/// Interactive element attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Affordance {
    /// Button asking the client to submit its current location.
    RequestLocation,
    /// Button issuing a stop command.
    StopSharing,
    /// Button opening the bot's web app.
    OpenWebApp { url: String },
}

/// A text message sent to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affordance: Option<Affordance>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            affordance: None,
        }
    }

    pub fn with_affordance(mut self, affordance: Affordance) -> Self {
        self.affordance = Some(affordance);
        self
    }
}

const COMMANDS: &str = "/share <id> - start sharing your location with a peer\n\
/stop - stop sharing, or stop receiving\n\
/whoami - show your peer ID\n\
/menu - open the web menu\n\
/help - show this help";

pub fn greeting() -> OutboundMessage {
    OutboundMessage::text(format!(
        "Hi! I relay your live location to a friend.\n\nCommands:\n{COMMANDS}"
    ))
}

pub fn help() -> OutboundMessage {
    OutboundMessage::text(format!("Available commands:\n{COMMANDS}"))
}

pub fn menu(web_url: &str) -> OutboundMessage {
    OutboundMessage::text("Tap the button to open the menu.").with_affordance(
        Affordance::OpenWebApp {
            url: web_url.to_string(),
        },
    )
}

pub fn identity(peer: PeerId, display_name: Option<&str>) -> OutboundMessage {
    match display_name {
        Some(name) => OutboundMessage::text(format!("You are {name}. Your ID: {peer}")),
        None => OutboundMessage::text(format!("Your ID: {peer}")),
    }
}

/// Confirmation to a sender whose session just started.
pub fn sharing_started(receiver: PeerId, receiver_name: &str) -> OutboundMessage {
    OutboundMessage::text(format!(
        "You are now sharing your location with {receiver_name} ({receiver}). \
         Send a location to relay it."
    ))
    .with_affordance(Affordance::RequestLocation)
}

/// Notice to a receiver that a sender started sharing with them.
pub fn incoming_share(sender: PeerId) -> OutboundMessage {
    OutboundMessage::text(format!(
        "Peer {sender} started sharing their location with you."
    ))
    .with_affordance(Affordance::StopSharing)
}

pub fn sharing_stopped(receiver: PeerId) -> OutboundMessage {
    OutboundMessage::text(format!("You stopped sharing your location with {receiver}."))
}

pub fn sender_stopped(sender: PeerId) -> OutboundMessage {
    OutboundMessage::text(format!("Peer {sender} stopped sharing their location with you."))
}

pub fn receiving_stopped(sender: PeerId) -> OutboundMessage {
    OutboundMessage::text(format!("You are no longer receiving location from {sender}."))
}

pub fn receiver_stopped(receiver: PeerId) -> OutboundMessage {
    OutboundMessage::text(format!(
        "Peer {receiver} stopped receiving your location. Sharing has ended."
    ))
}

/// Text sent to the receiver alongside a relayed location pin.
pub fn location_notice(sender: PeerId, sample: &LocationSample) -> OutboundMessage {
    OutboundMessage::text(format!("Location from {sender}: {sample}"))
}

pub fn location_relayed(receiver: PeerId) -> OutboundMessage {
    OutboundMessage::text(format!("Location delivered to {receiver}."))
        .with_affordance(Affordance::RequestLocation)
}

/// Human-readable reply for a failed operation.
pub fn for_error(err: &RelayError) -> OutboundMessage {
    match err {
        RelayError::AlreadySharing { receiver, .. } => OutboundMessage::text(format!(
            "You are already sharing with {receiver}. Use /stop first."
        )),
        RelayError::InvalidReceiverId(text) => OutboundMessage::text(format!(
            "\"{text}\" is not a valid peer ID. Usage: /share <id>"
        )),
        RelayError::SelfShare(_) => OutboundMessage::text(
            "You cannot share your location with yourself. Usage: /share <id>",
        ),
        RelayError::ReceiverNotFound(peer) => {
            OutboundMessage::text(format!("Peer {peer} was not found."))
        }
        RelayError::NoActiveSession(_) => OutboundMessage::text(
            "You are not sharing with anyone. Use /share <id> first.",
        ),
        RelayError::NotSharing(_) => {
            OutboundMessage::text("You are not sharing or receiving a location.")
        }
        RelayError::DeliveryFailed { peer, .. } => OutboundMessage::text(format!(
            "Could not deliver to {peer}. They may have blocked the bot; sharing stays active."
        )),
        RelayError::LockPoisoned | RelayError::Io(_) => generic_failure(),
    }
}

pub fn unknown_command(text: &str) -> OutboundMessage {
    OutboundMessage::text(format!("Unknown command: {text}. Try /help."))
}

pub fn generic_failure() -> OutboundMessage {
    OutboundMessage::text("Something went wrong. Please try again.")
}
