//! Transport collaborator seam.
//!
//! The session core does not talk to a socket directly; it consumes
//! [`TransportEvent`]s from, and writes frames to, anything implementing
//! [`Transport`]. [`WsTransport`] is the production implementation over
//! a tokio-tungstenite client connection. Tests substitute scripted
//! transports.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::errors::{ClientError, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle and data notifications from a connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and usable.
    Opened,
    /// One complete text frame arrived.
    Message(String),
    /// The connection closed.
    Closed {
        /// Close code from the peer, when the close was clean.
        code: Option<u16>,
        /// Close reason from the peer, empty when none was given.
        reason: String,
        /// Whether the peer performed a close handshake; `false` means
        /// the connection was severed abruptly.
        was_clean: bool,
    },
    /// The connection failed.
    Error(String),
}

/// A bidirectional message-oriented connection.
///
/// One event at a time: the session event loop awaits
/// [`Transport::next`] and fully processes each event before asking for
/// the next one.
#[async_trait]
pub trait Transport: Send {
    /// Write one text frame to the connection.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Await the next transport event. `None` means the event source is
    /// exhausted; the session treats it as an abrupt close.
    async fn next(&mut self) -> Option<TransportEvent>;

    /// Close the connection. Errors are ignored; the session is ending.
    async fn close(&mut self);
}

/// Production transport over a tokio-tungstenite WebSocket client.
pub struct WsTransport {
    ws: WsStream,
    opened: bool,
}

impl WsTransport {
    /// Dial a pre-built endpoint locator.
    pub async fn connect(endpoint: &str) -> Result<Self, ClientError> {
        let (ws, _) = connect_async(endpoint)
            .await
            .map_err(|err| ClientError::Connect {
                endpoint: endpoint.to_owned(),
                reason: err.to_string(),
            })?;
        Ok(Self { ws, opened: false })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.ws
            .send(Message::Text(frame.into()))
            .await
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    async fn next(&mut self) -> Option<TransportEvent> {
        if !self.opened {
            // connect_async completed, so the connection is already up;
            // surface that as the first event.
            self.opened = true;
            return Some(TransportEvent::Opened);
        }
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some(TransportEvent::Message(text.to_string()));
                }
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => return Some(TransportEvent::Message(text.to_owned())),
                    Err(_) => {
                        debug!(len = bytes.len(), "ignoring non-UTF8 binary frame");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map_or((None, String::new()), |f| {
                            (Some(u16::from(f.code)), f.reason.to_string())
                        });
                    return Some(TransportEvent::Closed {
                        code,
                        reason,
                        was_clean: true,
                    });
                }
                // Ping/Pong and raw frames are transport noise.
                Some(Ok(_)) => {}
                Some(Err(err)) => return Some(TransportEvent::Error(err.to_string())),
                None => {
                    return Some(TransportEvent::Closed {
                        code: None,
                        reason: String::new(),
                        was_clean: false,
                    });
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}
