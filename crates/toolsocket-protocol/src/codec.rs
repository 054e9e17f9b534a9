//! Wire codec for the line-oriented tool message format.
//!
//! A frame is newline-terminated UTF-8 text:
//!
//! ```text
//! toolmessageversion1.0
//! id:<id>
//! replytoid:<replyToId>      (only when set)
//! messagetype:<messageType>  (only when set)
//! payloadtype:<payloadType>  (only with a payload)
//! payload:
//! <JSON document>
//! ```
//!
//! Header order is fixed on encode for wire compatibility with existing
//! deployments. The decoder tolerates reordered headers but treats the
//! payload section as terminal: the whole remainder of the frame after
//! the `payload` line is handed to the JSON parser as one document, and
//! no later lines are interpreted.

use serde_json::Value;
use std::fmt::Write as _;
use tracing::warn;

use crate::errors::FrameDefect;
use crate::message::{InboundMessage, OutboundMessage};

/// Literal first line of every frame.
pub const SIGNATURE: &str = "toolmessageversion1.0";

/// Render an outbound message to wire text.
///
/// The signature line and the `id` header are always emitted;
/// `replytoid` and `messagetype` only when set; the
/// `payloadtype`/`payload` pair only when both the payload type and the
/// payload value are present. No newline follows the JSON document.
#[must_use]
pub fn encode(message: &OutboundMessage) -> String {
    let mut frame = format!("{SIGNATURE}\n");
    let _ = writeln!(frame, "id:{}", message.id());
    if let Some(reply_to) = message.reply_to_id() {
        let _ = writeln!(frame, "replytoid:{reply_to}");
    }
    if let Some(message_type) = message.message_type() {
        let _ = writeln!(frame, "messagetype:{message_type}");
    }
    if let (Some(payload_type), Some(payload)) = (message.payload_type(), message.payload()) {
        let _ = writeln!(frame, "payloadtype:{payload_type}");
        frame.push_str("payload:\n");
        frame.push_str(&payload.to_string());
    }
    frame
}

/// Decode one frame of wire text into an [`InboundMessage`].
///
/// Never panics and never returns an error: malformed input yields a
/// message carrying a [`FrameDefect`], which the dispatcher reports and
/// drops. The scan is greedy and line-oriented:
///
/// 1. The first line must equal [`SIGNATURE`] exactly, or decoding stops
///    with [`FrameDefect::BadSignature`] and no fields populated.
/// 2. Each later line splits at its first colon into a header name and
///    value; lines with no colon, or a colon at position zero, are
///    ignored. `id` and `replytoid` must parse as integers to be kept.
/// 3. A `payload` header stops the scan and the remainder of the input
///    is parsed as exactly one JSON document. Trailing text after that
///    document is ignored, matching deployed peer decoders.
/// 4. The message is valid iff both `id` and `messagetype` were set;
///    otherwise it carries [`FrameDefect::IncompleteMessage`].
#[must_use]
pub fn decode(text: &str) -> InboundMessage {
    let mut message = InboundMessage {
        id: None,
        reply_to_id: None,
        message_type: None,
        payload_type: None,
        payload: None,
        defect: None,
        raw: text.to_owned(),
    };

    let Some((first, mut pos)) = next_line(text, 0) else {
        message.defect = Some(FrameDefect::BadSignature);
        return message;
    };
    if first != SIGNATURE {
        message.defect = Some(FrameDefect::BadSignature);
        return message;
    }

    while let Some((line, next)) = next_line(text, pos) {
        pos = next;
        let Some(colon) = line.find(':') else { continue };
        if colon == 0 {
            continue;
        }
        let (name, value) = (&line[..colon], &line[colon + 1..]);
        match name {
            "id" => message.id = parse_numeric(name, value),
            "replytoid" => message.reply_to_id = parse_numeric(name, value),
            "messagetype" => message.message_type = Some(value.to_owned()),
            "payloadtype" => message.payload_type = Some(value.to_owned()),
            "payload" => {
                match parse_payload(&text[pos..]) {
                    Ok(payload) => message.payload = Some(payload),
                    Err(defect) => message.defect = Some(defect),
                }
                break;
            }
            _ => {}
        }
    }

    if message.defect.is_none() && (message.id.is_none() || message.message_type.is_none()) {
        message.defect = Some(FrameDefect::IncompleteMessage);
    }
    message
}

/// Next line starting at byte offset `pos`, with the offset just past its
/// terminator. Accepts `\n` and `\r\n`; a final unterminated line is
/// returned whole.
fn next_line(text: &str, pos: usize) -> Option<(&str, usize)> {
    let rest = &text[pos..];
    if rest.is_empty() {
        return None;
    }
    match rest.find('\n') {
        Some(i) => Some((rest[..i].trim_end_matches('\r'), pos + i + 1)),
        None => Some((rest.trim_end_matches('\r'), text.len())),
    }
}

fn parse_numeric(name: &str, value: &str) -> Option<u64> {
    match value.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(name, value, "ignoring non-numeric header value");
            None
        }
    }
}

/// Parse the payload section as exactly one JSON document, ignoring any
/// trailing text, the way deployed peer decoders read it.
fn parse_payload(remainder: &str) -> Result<Value, FrameDefect> {
    let mut documents = serde_json::Deserializer::from_str(remainder).into_iter::<Value>();
    match documents.next() {
        Some(Ok(payload)) => Ok(payload),
        Some(Err(err)) => Err(FrameDefect::MalformedPayload {
            detail: err.to_string(),
        }),
        None => Err(FrameDefect::MalformedPayload {
            detail: "payload section is empty".to_owned(),
        }),
    }
}
