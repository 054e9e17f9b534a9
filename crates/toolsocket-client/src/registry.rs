//! Handler registry, dispatch, and the advisory capability audit.
//!
//! Routing is an explicit mapping from message-type name to a registered
//! handler — there is no name-convention reflection. The expected set of
//! server message types is a configuration value
//! ([`MessageTypeDescriptor`]), and the audit that compares it against
//! the registered handlers is a development-time lint: it warns and
//! never blocks operation.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use toolsocket_protocol::{FrameDefect, InboundMessage};

/// Handler for one server message type.
///
/// Invoked synchronously from the session event loop, one message at a
/// time; implementations must not block on the session itself.
pub trait MessageHandler: Send + Sync {
    /// Handle one validated inbound message.
    fn on_message(&self, message: &InboundMessage);
}

impl<F> MessageHandler for F
where
    F: Fn(&InboundMessage) + Send + Sync,
{
    fn on_message(&self, message: &InboundMessage) {
        self(message);
    }
}

/// Handler for the connection-open event.
pub trait OpenHandler: Send + Sync {
    /// Called once when the connection is established.
    fn on_open(&self);
}

impl<F> OpenHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_open(&self) {
        self();
    }
}

/// One expected server message type, supplied as configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTypeDescriptor {
    /// Message type name as it appears on the wire.
    pub type_name: String,
    /// Shape tag of the payload this type carries, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload_shape: Option<String>,
}

impl MessageTypeDescriptor {
    /// Descriptor for a message type with no payload shape.
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            payload_shape: None,
        }
    }
}

/// Advisory finding from [`HandlerRegistry::audit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuditWarning {
    /// No connection-open handler is registered.
    MissingOpen,
    /// An expected server message type has no handler.
    MissingHandler {
        /// The unhandled message type.
        type_name: String,
    },
    /// A handler is registered for a type the server is not expected to
    /// send.
    InessentialHandler {
        /// The unexpected message type.
        type_name: String,
    },
}

impl fmt::Display for AuditWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOpen => write!(f, "registry lacks an open handler"),
            Self::MissingHandler { type_name } => {
                write!(f, "no handler registered for server message type '{type_name}'")
            }
            Self::InessentialHandler { type_name } => {
                write!(f, "handler registered for unexpected message type '{type_name}'")
            }
        }
    }
}

/// What dispatch did with one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler was invoked exactly once.
    Handled,
    /// The message was valid but no handler is registered for its type.
    Unrouted {
        /// The unrouted message type.
        type_name: String,
    },
    /// The message was invalid and dropped without invoking a handler.
    Invalid {
        /// Why the frame was rejected.
        defect: FrameDefect,
    },
}

/// Registry mapping message-type names to handlers, plus the
/// connection-open handler.
///
/// Built once before session construction and read-only afterwards; the
/// session event loop is the only caller of [`HandlerRegistry::dispatch`].
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
    open: Option<Arc<dyn OpenHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            open: None,
        }
    }

    /// Register a handler for a message type. Re-registering a type
    /// replaces the previous handler.
    pub fn register(&mut self, type_name: &str, handler: impl MessageHandler + 'static) {
        let _ = self.handlers.insert(type_name.to_owned(), Arc::new(handler));
    }

    /// Register the connection-open handler.
    pub fn on_open(&mut self, handler: impl OpenHandler + 'static) {
        self.open = Some(Arc::new(handler));
    }

    /// Check whether a message type has a handler.
    #[must_use]
    pub fn has_handler(&self, type_name: &str) -> bool {
        self.handlers.contains_key(type_name)
    }

    /// List all handled message types (sorted).
    #[must_use]
    pub fn handled_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Invoke the connection-open handler, if registered.
    pub fn notify_open(&self) {
        if let Some(open) = &self.open {
            open.on_open();
        }
    }

    /// Compare the registry against the expected server message types.
    ///
    /// Advisory only: every finding is logged as a warning and returned,
    /// and none prevents operation. Expected types are reported in input
    /// order, then inessential registrations in name order.
    pub fn audit(&self, expected: &[MessageTypeDescriptor]) -> Vec<AuditWarning> {
        let mut warnings = Vec::new();

        if self.open.is_none() {
            warnings.push(AuditWarning::MissingOpen);
        }

        for descriptor in expected {
            if !self.handlers.contains_key(&descriptor.type_name) {
                warnings.push(AuditWarning::MissingHandler {
                    type_name: descriptor.type_name.clone(),
                });
            }
        }

        let expected_names: HashSet<&str> =
            expected.iter().map(|d| d.type_name.as_str()).collect();
        let mut inessential: Vec<&String> = self
            .handlers
            .keys()
            .filter(|name| !expected_names.contains(name.as_str()))
            .collect();
        inessential.sort();
        for type_name in inessential {
            warnings.push(AuditWarning::InessentialHandler {
                type_name: type_name.clone(),
            });
        }

        for warning in &warnings {
            warn!("{warning}");
        }
        warnings
    }

    /// Route one decoded inbound message.
    ///
    /// Invalid messages are dropped without invoking any handler; the
    /// caller turns the returned defect into a user-visible notice. A
    /// valid message with no registered handler is logged and dropped
    /// silently.
    pub fn dispatch(&self, message: &InboundMessage) -> DispatchOutcome {
        if let Some(defect) = message.defect() {
            error!(%defect, "dropping invalid message from server");
            return DispatchOutcome::Invalid {
                defect: defect.clone(),
            };
        }
        let Some(type_name) = message.message_type() else {
            // Valid messages always carry a type; treat the impossible
            // case as incomplete rather than panicking.
            return DispatchOutcome::Invalid {
                defect: FrameDefect::IncompleteMessage,
            };
        };

        match self.handlers.get(type_name) {
            Some(handler) => {
                handler.on_message(message);
                DispatchOutcome::Handled
            }
            None => {
                info!(type_name, "no handler for messages of this type");
                DispatchOutcome::Unrouted {
                    type_name: type_name.to_owned(),
                }
            }
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handled_types", &self.handled_types())
            .field("has_open", &self.open.is_some())
            .finish()
    }
}
