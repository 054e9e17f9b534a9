//! Protocol message value objects.
//!
//! Messages are immutable, created per send/receive event, and discarded
//! after transmission or dispatch — there is no persistence. Rendering to
//! and from wire text lives in [`crate::codec`].

use serde_json::Value;

use crate::codec;
use crate::counter::MessageIdCounter;
use crate::errors::FrameDefect;

/// An outbound protocol message.
///
/// The id is drawn from the session's [`MessageIdCounter`] at
/// construction and is never caller-supplied. The payload section of a
/// frame is only rendered when both the payload type and the payload
/// value are present; [`OutboundMessage::with_payload`] enforces that by
/// setting them together.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundMessage {
    id: u64,
    message_type: Option<String>,
    payload_type: Option<String>,
    reply_to_id: Option<u64>,
    payload: Option<Value>,
}

impl OutboundMessage {
    /// Create a message of the given type with a fresh id.
    pub fn new(counter: &MessageIdCounter, message_type: impl Into<String>) -> Self {
        Self {
            id: counter.next_id(),
            message_type: Some(message_type.into()),
            payload_type: None,
            reply_to_id: None,
            payload: None,
        }
    }

    /// Create a message with no type tag.
    ///
    /// Allowed by the wire format but discouraged: the receiving
    /// dispatcher routes by message type, so an untyped message can only
    /// be dropped there. Prefer [`OutboundMessage::new`].
    pub fn untyped(counter: &MessageIdCounter) -> Self {
        Self {
            id: counter.next_id(),
            message_type: None,
            payload_type: None,
            reply_to_id: None,
            payload: None,
        }
    }

    /// Mark this message as an answer to a prior inbound message.
    #[must_use]
    pub fn in_reply_to(mut self, id: u64) -> Self {
        self.reply_to_id = Some(id);
        self
    }

    /// Attach a payload together with its shape tag.
    #[must_use]
    pub fn with_payload(mut self, payload_type: impl Into<String>, payload: Value) -> Self {
        self.payload_type = Some(payload_type.into());
        self.payload = Some(payload);
        self
    }

    /// Message id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Semantic kind of this message, if tagged.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    /// Shape tag of the payload, if any.
    #[must_use]
    pub fn payload_type(&self) -> Option<&str> {
        self.payload_type.as_deref()
    }

    /// Id of the inbound message this answers, if any.
    #[must_use]
    pub fn reply_to_id(&self) -> Option<u64> {
        self.reply_to_id
    }

    /// Structured payload, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Render this message to wire text.
    #[must_use]
    pub fn to_frame(&self) -> String {
        codec::encode(self)
    }
}

/// An inbound protocol message decoded from one frame of wire text.
///
/// Produced only by [`crate::codec::decode`]. An invalid frame still
/// yields a message — carrying the [`FrameDefect`] that explains the
/// rejection — so the dispatcher can report and drop it without an error
/// path through the transport event loop.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    pub(crate) id: Option<u64>,
    pub(crate) reply_to_id: Option<u64>,
    pub(crate) message_type: Option<String>,
    pub(crate) payload_type: Option<String>,
    pub(crate) payload: Option<Value>,
    pub(crate) defect: Option<FrameDefect>,
    pub(crate) raw: String,
}

impl InboundMessage {
    /// Message id, when the frame carried a numeric `id` header.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// Id of the outbound message this answers, if any.
    #[must_use]
    pub fn reply_to_id(&self) -> Option<u64> {
        self.reply_to_id
    }

    /// Semantic kind of this message, used for dispatch.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    /// Shape tag of the payload, if any.
    #[must_use]
    pub fn payload_type(&self) -> Option<&str> {
        self.payload_type.as_deref()
    }

    /// Structured payload, if the frame carried a payload section.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Why the frame was rejected, if it was.
    #[must_use]
    pub fn defect(&self) -> Option<&FrameDefect> {
        self.defect.as_ref()
    }

    /// Whether the frame matched the signature and carried both required
    /// headers. Only valid messages are dispatched.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.defect.is_none()
    }

    /// The original frame text, retained for diagnostics.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_draws_sequential_ids() {
        let counter = MessageIdCounter::starting_at(5);
        let first = OutboundMessage::new(&counter, "Ping");
        let second = OutboundMessage::new(&counter, "Ping");
        assert_eq!(first.id(), 5);
        assert_eq!(second.id(), 6);
    }

    #[test]
    fn with_payload_sets_type_and_value_together() {
        let counter = MessageIdCounter::starting_at(0);
        let message = OutboundMessage::new(&counter, "GetResource")
            .with_payload("ResourceQuery", json!({"name": "alpha"}));
        assert_eq!(message.payload_type(), Some("ResourceQuery"));
        assert_eq!(message.payload().unwrap()["name"], "alpha");
    }

    #[test]
    fn in_reply_to_records_correlation_id() {
        let counter = MessageIdCounter::starting_at(0);
        let message = OutboundMessage::new(&counter, "Ack").in_reply_to(99);
        assert_eq!(message.reply_to_id(), Some(99));
    }

    #[test]
    fn untyped_message_has_no_type() {
        let counter = MessageIdCounter::starting_at(0);
        let message = OutboundMessage::untyped(&counter);
        assert_eq!(message.message_type(), None);
        assert_eq!(message.payload(), None);
    }

    #[test]
    fn to_frame_matches_codec_encode() {
        let counter = MessageIdCounter::starting_at(12);
        let message = OutboundMessage::new(&counter, "Ping");
        assert_eq!(message.to_frame(), codec::encode(&message));
    }
}
