//! # toolsocket-client
//!
//! Handler registry, dispatcher, and WebSocket session for the
//! toolsocket protocol.
//!
//! A [`Session`] owns one connection. Incoming frames are decoded by
//! `toolsocket-protocol` and routed by message type through a
//! [`HandlerRegistry`] built explicitly by the application; transport
//! lifecycle and rejected frames are surfaced as structured
//! [`SessionEvent`]s, leaving presentation to the caller.
//!
//! ```no_run
//! use toolsocket_client::{ClientSettings, HandlerRegistry, Session};
//! use toolsocket_client::InboundMessage;
//!
//! # async fn run() -> Result<(), toolsocket_client::ClientError> {
//! let mut registry = HandlerRegistry::new();
//! registry.on_open(|| println!("connected"));
//! registry.register("ResourceChanged", |message: &InboundMessage| {
//!     println!("changed: {:?}", message.payload());
//! });
//!
//! let settings = ClientSettings::default();
//! let (session, mut events) = Session::connect(&settings, registry).await?;
//! let _ = session.send(&session.outbound("Ping"));
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod registry;
pub mod session;
pub mod settings;
pub mod transport;

pub use errors::{ClientError, SendError, TransportError};
pub use registry::{
    AuditWarning, DispatchOutcome, HandlerRegistry, MessageHandler, MessageTypeDescriptor,
    OpenHandler,
};
pub use session::{Session, SessionEvent, SessionState};
pub use settings::{ClientSettings, SettingsError, load_settings_from_path};
pub use transport::{Transport, TransportEvent, WsTransport};

// Protocol types appear throughout this crate's API surface.
pub use toolsocket_protocol::{FrameDefect, InboundMessage, MessageIdCounter, OutboundMessage};
