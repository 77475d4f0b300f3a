use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use crate::protocol::{decode_inbound, ClientMessage, Inbound, ServerMessage};

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("WebSocket connection failed: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid endpoint: {0}")]
    UrlParse(#[from] url::ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Everything the channel surfaces to the session loop: state transitions,
/// decoded protocol messages, and the backend's untyped error payloads.
#[derive(Debug)]
pub enum ConnectionEvent {
    State(ConnectionState),
    Message(ServerMessage),
    BackendError(String),
}

/// Owns the one bidirectional channel to the backend.
///
/// Outbound sends are fire-and-forget: the protocol is not
/// acknowledgment-based, and a message offered while the channel is down is
/// silently dropped. Inbound decode failures are per-message failures; the
/// payload is logged and dropped and the channel keeps running.
pub struct Connection {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Establish one channel. The returned connection has already emitted
    /// `State(Open)` into its event stream.
    pub async fn open(url: &Url) -> Result<Self, ConnectionError> {
        log::info!("connecting to {}", url);
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (evt_tx, evt_rx) = mpsc::unbounded_channel::<ConnectionEvent>();
        let _ = evt_tx.send(ConnectionEvent::State(ConnectionState::Open));

        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        log::warn!("failed to encode outbound message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    log::warn!("outbound send failed, channel is down: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => match decode_inbound(text.as_str()) {
                        Ok(Inbound::Message(msg)) => {
                            if evt_tx.send(ConnectionEvent::Message(msg)).is_err() {
                                break;
                            }
                        }
                        Ok(Inbound::Error(error)) => {
                            log::warn!("backend reported error: {}", error);
                            if evt_tx.send(ConnectionEvent::BackendError(error)).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            log::warn!("dropping malformed inbound payload: {}", e);
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        log::info!("server closed connection: {:?}", frame);
                        break;
                    }
                    Ok(_) => {
                        // Ping/pong/binary carry nothing for this protocol.
                    }
                    Err(e) => {
                        log::error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            let _ = evt_tx.send(ConnectionEvent::State(ConnectionState::Closed));
        });

        Ok(Self {
            outbound: out_tx,
            events: evt_rx,
            writer,
            reader,
        })
    }

    /// Enqueue a message if the channel is up, else drop it.
    pub fn send(&self, msg: ClientMessage) {
        if self.outbound.send(msg).is_err() {
            log::debug!("channel closed, dropping outbound message");
        }
    }

    /// Next state transition or decoded message. `None` once the channel is
    /// fully torn down.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }

    /// Release the socket and both pump tasks. In-flight but undelivered
    /// messages are discarded; there is no drain guarantee.
    pub fn close(self) {
        log::info!("closing connection");
        self.writer.abort();
        self.reader.abort();
    }
}

/// Capped exponential backoff for the opt-in reconnect loop: 500 ms doubling
/// up to 30 s.
pub fn backoff_delay(attempt: u32) -> Duration {
    const BASE_MS: u64 = 500;
    const CAP_MS: u64 = 30_000;
    let exp = attempt.min(16);
    Duration::from_millis(BASE_MS.saturating_mul(1 << exp).min(CAP_MS))
}
