use crate::application::ConnectionConfig;
use crate::infrastructure::error::{P2PError, Result};
use crate::infrastructure::transport::{LinkEvent, SignalingConnector, SignalingLink};
use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use phonedrop_core::SessionId;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Signaling over a native WebSocket to the relay endpoint
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    base_url: String,
}

impl WebSocketConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(config.signaling_url.clone())
    }
}

#[async_trait]
impl SignalingConnector for WebSocketConnector {
    async fn open(
        &self,
        session_id: &SessionId,
    ) -> Result<(Box<dyn SignalingLink>, UnboundedReceiver<LinkEvent>)> {
        let url = ConnectionConfig::connect_url(&self.base_url, session_id);
        info!(session = %session_id.short(), "Opening signaling link");

        let (stream, _response) = connect_async(url).await.map_err(|e| match e {
            tungstenite::Error::Http(response) => {
                P2PError::ConnectionFailed(format!("relay rejected link: {}", response.status()))
            }
            other => P2PError::ConnectionFailed(other.to_string()),
        })?;

        let (sink, mut read) = stream.split();
        let (tx, rx) = unbounded_channel();
        let _ = tx.send(LinkEvent::Opened);

        tokio::spawn(async move {
            let clean = loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if tx.send(LinkEvent::Message(text.as_str().to_owned())).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "Relay closed the link");
                        break true;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "Signaling link error");
                        let _ = tx.send(LinkEvent::Error(e.to_string()));
                        break false;
                    }
                    None => break false,
                }
            };
            let _ = tx.send(LinkEvent::Closed { clean });
        });

        Ok((Box::new(WebSocketLink { sink }), rx))
    }
}

struct WebSocketLink {
    sink: SplitSink<Stream, Message>,
}

#[async_trait]
impl SignalingLink for WebSocketLink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.sink
            .send(Message::text(text))
            .await
            .map_err(|e| P2PError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            debug!(error = %e, "Signaling link already gone");
        }
    }
}
