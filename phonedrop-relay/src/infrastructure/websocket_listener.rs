use crate::application::{Accepted, RelayHandle};
use crate::domain::Outbound;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use phonedrop_core::SessionId;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info, instrument, warn};

/// Bridge an upgraded socket to the relay actor until either side ends
#[instrument(skip_all, fields(session = %session_id.short(), role = %accepted.role, link = %accepted.link_id))]
pub async fn listen(
    socket: WebSocket,
    outbound: Receiver<Outbound>,
    relay: RelayHandle,
    session_id: SessionId,
    accepted: Accepted,
) {
    debug!("WebSocket connection established");
    let (ws_sender, ws_receiver) = socket.split();

    let sender_task = handle_outgoing_messages(outbound, ws_sender);
    let receiver_task = handle_incoming_messages(ws_receiver, &relay, &session_id, accepted);

    tokio::select! {
        _ = sender_task => {
            info!("Sender task completed");
        }
        _ = receiver_task => {
            info!("Receiver task completed");
        }
    }

    if let Err(e) = relay
        .disconnect(&session_id, accepted.role, accepted.link_id)
        .await
    {
        error!(error = ?e, "Failed to disconnect");
    }
}

pub async fn handle_outgoing_messages(
    mut rx: Receiver<Outbound>,
    mut ws_sender: SplitSink<WebSocket, Message>,
) {
    while let Some(outbound) = rx.recv().await {
        let (message, last) = match outbound {
            Outbound::Text(text) => (Message::Text(text), false),
            Outbound::Close { code, reason } => (
                Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                })),
                true,
            ),
        };

        if let Err(e) = ws_sender.send(message).await {
            error!(error = ?e, "Failed to send message");
            break;
        }
        if last {
            debug!("Closed by relay");
            break;
        }
    }
}

pub async fn handle_incoming_messages(
    mut receiver: SplitStream<WebSocket>,
    relay: &RelayHandle,
    session_id: &SessionId,
    accepted: Accepted,
) {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if let Err(e) = relay
                    .relay(session_id, accepted.role, accepted.link_id, text)
                    .await
                {
                    error!(error = ?e, "Failed to hand message to relay");
                    break;
                }
            }
            Ok(Message::Binary(data)) => {
                warn!(len = data.len(), "Dropping binary frame on signaling link");
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Client closed the link");
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                warn!(error = ?e, "Failed to receive message");
                break;
            }
        }
    }
}
