//! REST API handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::types::{
    CommandRequest, ErrorResponse, InboxResponse, ListSessionsResponse, PeerResponse,
    RegisterPeerRequest, SessionSummary,
};
use crate::config::DEFAULT_WEB_URL;
use crate::dispatch::{DispatchReport, Dispatcher, Event};
use crate::error::RelayError;
use crate::peer::{LocationSample, PeerId};
use crate::security::ApiKeyStore;
use crate::transport::{LoopbackTransport, DEFAULT_SEND_TIMEOUT};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<LoopbackTransport>,
    pub dispatcher: Arc<Dispatcher>,
    pub auth: Arc<ApiKeyStore>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_options(DEFAULT_SEND_TIMEOUT, DEFAULT_WEB_URL)
    }

    pub fn with_options(send_timeout: Duration, web_url: impl Into<String>) -> Self {
        let gateway = Arc::new(LoopbackTransport::new());
        let dispatcher = Arc::new(Dispatcher::with_transport(
            Arc::clone(&gateway),
            send_timeout,
            web_url,
        ));
        Self {
            gateway,
            dispatcher,
            auth: Arc::new(ApiKeyStore::disabled()),
        }
    }

    pub fn with_auth(mut self, auth: ApiKeyStore) -> Self {
        self.auth = Arc::new(auth);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

fn internal_error(e: RelayError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::internal_error(e.to_string())),
    )
}

/// API information endpoint.
pub async fn api_info(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let active_sessions = state
        .dispatcher
        .sessions()
        .active_sessions()
        .map_err(internal_error)?;

    Ok(Json(serde_json::json!({
        "name": "location-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "active_sessions": active_sessions,
        "peers": state.gateway.count(),
    })))
}

/// Register a peer, or rename an existing one.
pub async fn register_peer(
    State(state): State<AppState>,
    Json(req): Json<RegisterPeerRequest>,
) -> Result<(StatusCode, Json<PeerResponse>), ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("name must not be empty")),
        ));
    }

    let created = state.gateway.register(req.id, name);
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(PeerResponse {
            id: req.id,
            name: name.to_string(),
            created,
        }),
    ))
}

/// Mark a peer unreachable, as if it had blocked the bot.
///
/// Its sessions are left untouched.
pub async fn block_peer(
    State(state): State<AppState>,
    Path(peer): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let peer = PeerId::new(peer);
    if state.gateway.set_reachable(peer, false) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::peer_not_found(peer)),
        ))
    }
}

/// Drain a peer's pending deliveries.
pub async fn drain_inbox(
    State(state): State<AppState>,
    Path(peer): Path<i64>,
) -> Result<Json<InboxResponse>, ApiError> {
    let peer = PeerId::new(peer);
    let deliveries = state.gateway.drain(peer).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::peer_not_found(peer)),
        )
    })?;

    Ok(Json(InboxResponse::new(peer, deliveries)))
}

/// Dispatch a bot command typed by a peer.
pub async fn post_command(
    State(state): State<AppState>,
    Path(peer): Path<i64>,
    Json(req): Json<CommandRequest>,
) -> Json<DispatchReport> {
    let report = state
        .dispatcher
        .dispatch_command(PeerId::new(peer), &req.text)
        .await;
    Json(report)
}

/// Dispatch a structured inbound event.
pub async fn post_event(
    State(state): State<AppState>,
    Json(event): Json<Event>,
) -> Result<Json<DispatchReport>, ApiError> {
    if let Event::Location {
        latitude,
        longitude,
        ..
    } = event
    {
        if !LocationSample::new(latitude, longitude).is_valid() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request(format!(
                    "coordinates out of range: {}, {}",
                    latitude, longitude
                ))),
            ));
        }
    }

    Ok(Json(state.dispatcher.dispatch(event).await))
}

/// List all active sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ListSessionsResponse>, ApiError> {
    let sessions = state
        .dispatcher
        .sessions()
        .sessions()
        .map_err(internal_error)?;

    let sessions: Vec<SessionSummary> = sessions.iter().map(SessionSummary::from).collect();
    Ok(Json(ListSessionsResponse {
        count: sessions.len(),
        sessions,
    }))
}
