//! WebSocket handler for live per-peer delivery streaming.
//!
//! A connected client acts as one peer: every delivery addressed to that
//! peer is pushed as it happens, and commands or location samples sent on
//! the socket are dispatched on the peer's behalf.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use super::handlers::AppState;
use super::types::{WsEvent, WsRequest};
use crate::dispatch::Event;
use crate::peer::{LocationSample, PeerId};
use crate::transport::Delivery;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(peer): Path<i64>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, PeerId::new(peer)))
}

async fn send_event(sink: &mut SplitSink<WebSocket, Message>, event: &WsEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to encode WebSocket frame: {}", e);
            true
        }
    }
}

/// Error frame for a peer the gateway does not know.
fn check_registered(state: &AppState, peer: PeerId) -> Option<WsEvent> {
    (!state.gateway.contains(peer)).then(|| {
        WsEvent::error("PEER_NOT_FOUND", format!("Peer {} is not registered", peer))
    })
}

/// Frame for a feed delivery, if it is addressed to `peer`.
fn delivery_frame(peer: PeerId, delivery: Delivery) -> Option<WsEvent> {
    (delivery.to == peer).then_some(WsEvent::Delivery {
        payload: delivery.payload,
    })
}

/// Handle one text frame sent by the client on behalf of `peer`.
async fn handle_text(state: &AppState, peer: PeerId, text: &str) -> WsEvent {
    let request: WsRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => return WsEvent::error("PARSE_ERROR", e.to_string()),
    };

    match request {
        WsRequest::Command { text } => {
            let report = state.dispatcher.dispatch_command(peer, &text).await;
            WsEvent::Report { report }
        }
        WsRequest::Location {
            latitude,
            longitude,
        } => {
            if !LocationSample::new(latitude, longitude).is_valid() {
                return WsEvent::error("BAD_REQUEST", "coordinates out of range");
            }
            let event = Event::Location {
                sender: peer,
                latitude,
                longitude,
            };
            let report = state.dispatcher.dispatch(event).await;
            WsEvent::Report { report }
        }
        WsRequest::Ping => WsEvent::Pong,
    }
}

/// Handle WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState, peer: PeerId) {
    let (mut sink, mut stream) = socket.split();

    if let Some(err) = check_registered(&state, peer) {
        let _ = send_event(&mut sink, &err).await;
        return;
    }

    let mut feed = state.gateway.subscribe();
    tracing::debug!(%peer, "WebSocket connected");

    loop {
        tokio::select! {
            delivery = feed.recv() => match delivery {
                Ok(delivery) => {
                    let Some(event) = delivery_frame(peer, delivery) else {
                        continue;
                    };
                    if !send_event(&mut sink, &event).await {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    let err = WsEvent::error(
                        "LAGGED",
                        format!("{} deliveries skipped; fetch the inbox to catch up", skipped),
                    );
                    if !send_event(&mut sink, &err).await {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            msg = stream.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                };

                let reply = handle_text(&state, peer, text.as_str()).await;
                if !send_event(&mut sink, &reply).await {
                    break;
                }
            }
        }
    }

    tracing::debug!(%peer, "WebSocket disconnected");
}
