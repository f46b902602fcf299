use super::{security_headers, websocket_listener};
use crate::application::RelayHandle;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::header::{HOST, ORIGIN};
use axum::http::uri::Authority;
use axum::http::{HeaderMap, Uri};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use phonedrop_core::SessionId;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

pub const SIGNAL_PATH: &str = "/api/signal/connect";

/// Outbound frames a slow device may have queued before frames are dropped
const LINK_BUFFER: usize = 32;

#[derive(Clone)]
struct SignalState {
    relay: RelayHandle,
    enforce_same_origin: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    session: Option<String>,
}

#[instrument(skip_all)]
pub fn create_signaling_route(relay: RelayHandle, config: &RelayConfig) -> Router {
    debug!(path = SIGNAL_PATH, "Creating signaling route");
    Router::new()
        .route(SIGNAL_PATH, get(handle_signal_connect))
        .layer(middleware::map_response(security_headers::apply))
        .with_state(SignalState {
            relay,
            enforce_same_origin: config.enforce_same_origin(),
        })
}

async fn handle_signal_connect(
    State(state): State<SignalState>,
    headers: HeaderMap,
    Query(params): Query<ConnectParams>,
    ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match connect(state, &headers, params, ws).await {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, "Connection attempt rejected");
            e.into_response()
        }
    }
}

async fn connect(
    state: SignalState,
    headers: &HeaderMap,
    params: ConnectParams,
    ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response> {
    if state.enforce_same_origin {
        check_same_origin(headers)?;
    }

    let raw = params
        .session
        .filter(|s| !s.is_empty())
        .ok_or(RelayError::MissingSessionId)?;
    let session_id =
        SessionId::parse(&raw).map_err(|e| RelayError::InvalidSessionId(e.to_string()))?;

    let ws = ws.map_err(|rejection| {
        debug!(%rejection, "Not a WebSocket upgrade");
        RelayError::UpgradeRequired
    })?;

    let (tx, rx) = mpsc::channel(LINK_BUFFER);
    let accepted = state.relay.accept(session_id.as_str(), tx).await?;
    info!(session = %session_id.short(), role = %accepted.role, "Upgrading signaling link");

    let relay = state.relay.clone();
    let failed_relay = state.relay;
    let failed_session = session_id.clone();

    Ok(ws
        .on_failed_upgrade(move |error| {
            warn!(%error, "WebSocket upgrade failed after accept");
            tokio::spawn(async move {
                let _ = failed_relay
                    .disconnect(&failed_session, accepted.role, accepted.link_id)
                    .await;
            });
        })
        .on_upgrade(move |socket| {
            websocket_listener::listen(socket, rx, relay, session_id, accepted)
        }))
}

/// Browsers always send `Origin` on WebSocket upgrades; native clients may not.
///
/// Hosts compare case-insensitively and a missing port means the default port
/// of the origin's scheme, so `https://host:443` matches `Host: host`.
fn check_same_origin(headers: &HeaderMap) -> Result<()> {
    let Some(origin) = headers.get(ORIGIN) else {
        return Ok(());
    };

    let origin_uri = origin.to_str().ok().and_then(|o| o.parse::<Uri>().ok());
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.parse::<Authority>().ok());

    match (origin_uri, host) {
        (Some(origin_uri), Some(host)) if same_authority(&origin_uri, &host) => Ok(()),
        _ => {
            warn!(?origin, host = ?headers.get(HOST), "Cross-origin upgrade rejected");
            Err(RelayError::ForbiddenOrigin)
        }
    }
}

fn same_authority(origin: &Uri, host: &Authority) -> bool {
    let Some(origin_host) = origin.host() else {
        return false;
    };
    let default_port = match origin.scheme_str() {
        Some("https" | "wss") => 443,
        Some("http" | "ws") => 80,
        _ => return false,
    };

    origin_host.eq_ignore_ascii_case(host.host())
        && origin.port_u16().unwrap_or(default_port) == host.port_u16().unwrap_or(default_port)
}
