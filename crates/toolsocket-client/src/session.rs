//! Socket session — owns one connection and runs the event loop.
//!
//! The session wires transport lifecycle events to the codec and the
//! handler registry: each event is processed to completion before the
//! next (cooperative, no overlapping handler invocations), and the
//! outcomes a user should see — open, close, transport failure, invalid
//! inbound message — are surfaced as [`SessionEvent`]s on a channel,
//! leaving presentation to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use toolsocket_protocol::{FrameDefect, MessageIdCounter, OutboundMessage, codec};

use crate::errors::{ClientError, SendError};
use crate::registry::{AuditWarning, DispatchOutcome, HandlerRegistry, MessageTypeDescriptor};
use crate::settings::ClientSettings;
use crate::transport::{Transport, TransportEvent, WsTransport};

/// Depth of the session-event channel. Events are dropped (with a log
/// line) rather than stalling the event loop when the consumer lags.
const EVENT_QUEUE_DEPTH: usize = 64;

/// Connection lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Connected; sends are accepted.
    Open,
    /// Severed by close, error, or shutdown. Terminal.
    Closed,
}

/// User-visible session outcome, replacing blocking notification
/// surfaces with a structured event the caller presents as it sees fit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The connection is established; the registry's open handler has
    /// been invoked.
    Opened,
    /// An inbound frame was rejected and dropped. Emitted exactly once
    /// per invalid frame.
    InvalidMessage {
        /// Why the frame was rejected.
        defect: FrameDefect,
        /// The offending frame text.
        raw: String,
    },
    /// The connection closed; the session is now `Closed`.
    Closed {
        /// Close code from the peer, when the close was clean.
        code: Option<u16>,
        /// Close reason from the peer, empty when none was given.
        reason: String,
        /// `false` means the connection was severed abruptly.
        was_clean: bool,
    },
    /// The transport failed; the session is now `Closed`.
    TransportError(String),
}

/// One client session over one connection.
///
/// Dropping the session ends the event loop, which closes the
/// connection.
#[derive(Debug)]
pub struct Session {
    command_tx: mpsc::Sender<String>,
    open: Arc<AtomicBool>,
    counter: Arc<MessageIdCounter>,
    audit_warnings: Vec<AuditWarning>,
    _event_loop: JoinHandle<()>,
}

impl Session {
    /// Connect to the configured endpoint and start the session.
    ///
    /// Audits the registry against the configured expected message types
    /// (advisory; findings are logged and kept on the session) and
    /// returns the session handle together with the receiver for
    /// [`SessionEvent`]s.
    pub async fn connect(
        settings: &ClientSettings,
        registry: HandlerRegistry,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>), ClientError> {
        let transport = WsTransport::connect(&settings.endpoint).await?;
        info!(endpoint = %settings.endpoint, "connected");
        Ok(Self::spawn_with_transport(
            transport,
            registry,
            &settings.expected_messages,
            MessageIdCounter::new(),
            settings.send_queue_depth,
        ))
    }

    /// Start a session over an already-established transport.
    ///
    /// The seam for tests and alternative transports; [`Session::connect`]
    /// delegates here.
    pub fn spawn_with_transport(
        transport: impl Transport + 'static,
        registry: HandlerRegistry,
        expected: &[MessageTypeDescriptor],
        counter: MessageIdCounter,
        send_queue_depth: usize,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let audit_warnings = registry.audit(expected);
        let (command_tx, command_rx) = mpsc::channel(send_queue_depth.max(1));
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let open = Arc::new(AtomicBool::new(true));

        let event_loop = tokio::spawn(run_session_loop(
            transport,
            registry,
            Arc::clone(&open),
            command_rx,
            event_tx,
        ));

        let session = Self {
            command_tx,
            open,
            counter: Arc::new(counter),
            audit_warnings,
            _event_loop: event_loop,
        };
        (session, event_rx)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.open.load(Ordering::Relaxed) {
            SessionState::Open
        } else {
            SessionState::Closed
        }
    }

    /// Whether the session is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Build an outbound message of the given type from the session's id
    /// counter.
    #[must_use]
    pub fn outbound(&self, message_type: impl Into<String>) -> OutboundMessage {
        OutboundMessage::new(&self.counter, message_type)
    }

    /// Send a message. Fire-and-forget: the frame is serialized here and
    /// handed to the transport writer without waiting for delivery.
    ///
    /// # Errors
    ///
    /// [`SendError::NotConnected`] when the session is not open;
    /// [`SendError::QueueFull`] when the outbound queue is full and the
    /// frame was not enqueued.
    pub fn send(&self, message: &OutboundMessage) -> Result<(), SendError> {
        if !self.open.load(Ordering::Relaxed) {
            return Err(SendError::NotConnected);
        }
        let frame = codec::encode(message);
        match self.command_tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(SendError::NotConnected),
            Err(TrySendError::Full(_)) => Err(SendError::QueueFull),
        }
    }

    /// Findings from the construction-time registry audit.
    #[must_use]
    pub fn audit_warnings(&self) -> &[AuditWarning] {
        &self.audit_warnings
    }
}

/// Deliver a session event without stalling the loop.
fn emit(event_tx: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if event_tx.try_send(event).is_err() {
        debug!("session event dropped (receiver gone or queue full)");
    }
}

/// The session event loop.
///
/// Transport events and outbound frames are interleaved but each is
/// processed to completion before the next; handlers never overlap for
/// one session. The loop ends — severing the connection — on close,
/// transport error, or when the session handle is dropped.
#[instrument(skip_all)]
async fn run_session_loop(
    mut transport: impl Transport,
    registry: HandlerRegistry,
    open: Arc<AtomicBool>,
    mut command_rx: mpsc::Receiver<String>,
    event_tx: mpsc::Sender<SessionEvent>,
) {
    loop {
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(frame) => {
                    if let Err(err) = transport.send(frame).await {
                        warn!(%err, "transport send failed");
                        open.store(false, Ordering::Relaxed);
                        emit(&event_tx, SessionEvent::TransportError(err.to_string()));
                        break;
                    }
                }
                None => {
                    // Session handle dropped; close out.
                    open.store(false, Ordering::Relaxed);
                    transport.close().await;
                    break;
                }
            },
            event = transport.next() => match event {
                Some(TransportEvent::Opened) => {
                    debug!("connection open");
                    registry.notify_open();
                    emit(&event_tx, SessionEvent::Opened);
                }
                Some(TransportEvent::Message(text)) => {
                    debug!(raw = %text, "message from server");
                    let message = codec::decode(&text);
                    if let DispatchOutcome::Invalid { defect } = registry.dispatch(&message) {
                        emit(&event_tx, SessionEvent::InvalidMessage { defect, raw: text });
                    }
                }
                Some(TransportEvent::Closed { code, reason, was_clean }) => {
                    info!(?code, reason = %reason, was_clean, "connection closed");
                    open.store(false, Ordering::Relaxed);
                    emit(&event_tx, SessionEvent::Closed { code, reason, was_clean });
                    break;
                }
                Some(TransportEvent::Error(detail)) => {
                    warn!(detail = %detail, "transport error");
                    open.store(false, Ordering::Relaxed);
                    emit(&event_tx, SessionEvent::TransportError(detail));
                    break;
                }
                None => {
                    open.store(false, Ordering::Relaxed);
                    emit(&event_tx, SessionEvent::Closed {
                        code: None,
                        reason: String::new(),
                        was_clean: false,
                    });
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_session(command_tx: mpsc::Sender<String>, open: bool) -> Session {
        Session {
            command_tx,
            open: Arc::new(AtomicBool::new(open)),
            counter: Arc::new(MessageIdCounter::starting_at(100)),
            audit_warnings: Vec::new(),
            _event_loop: tokio::spawn(async {}),
        }
    }

    #[tokio::test]
    async fn send_enqueues_encoded_frame() {
        let (command_tx, mut command_rx) = mpsc::channel(4);
        let session = bare_session(command_tx, true);

        let message = session.outbound("Ping");
        session.send(&message).unwrap();

        let frame = command_rx.recv().await.unwrap();
        assert_eq!(frame, codec::encode(&message));
    }

    #[tokio::test]
    async fn send_while_closed_is_not_connected() {
        let (command_tx, _command_rx) = mpsc::channel(4);
        let session = bare_session(command_tx, false);

        let message = session.outbound("Ping");
        assert_eq!(session.send(&message), Err(SendError::NotConnected));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn send_after_loop_gone_is_not_connected() {
        let (command_tx, command_rx) = mpsc::channel(4);
        drop(command_rx);
        let session = bare_session(command_tx, true);

        let message = session.outbound("Ping");
        assert_eq!(session.send(&message), Err(SendError::NotConnected));
    }

    #[tokio::test]
    async fn send_to_full_queue_reports_queue_full() {
        let (command_tx, _command_rx) = mpsc::channel(1);
        let session = bare_session(command_tx, true);

        session.send(&session.outbound("Ping")).unwrap();
        assert_eq!(
            session.send(&session.outbound("Ping")),
            Err(SendError::QueueFull)
        );
    }

    #[tokio::test]
    async fn outbound_messages_draw_sequential_ids() {
        let (command_tx, _command_rx) = mpsc::channel(4);
        let session = bare_session(command_tx, true);

        assert_eq!(session.outbound("A").id(), 100);
        assert_eq!(session.outbound("B").id(), 101);
        assert_eq!(session.outbound("C").id(), 102);
    }
}
