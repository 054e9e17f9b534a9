//! Frame defect taxonomy.

use thiserror::Error;

/// Why a decoded frame was rejected.
///
/// A defect marks the message invalid; it never escalates past the
/// decode/dispatch boundary, and the connection stays usable for
/// subsequent well-formed frames.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FrameDefect {
    /// The first line of the frame is not the protocol signature.
    #[error("frame does not start with the protocol signature")]
    BadSignature,

    /// The frame lacks an `id` or `messagetype` header.
    #[error("frame is missing an id or messagetype header")]
    IncompleteMessage,

    /// The payload section is not a well-formed JSON document.
    #[error("payload section is not valid JSON: {detail}")]
    MalformedPayload {
        /// Parser diagnostic for the failure.
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_signature_display() {
        assert_eq!(
            FrameDefect::BadSignature.to_string(),
            "frame does not start with the protocol signature"
        );
    }

    #[test]
    fn malformed_payload_carries_detail() {
        let defect = FrameDefect::MalformedPayload {
            detail: "expected value at line 1".into(),
        };
        assert!(defect.to_string().contains("expected value"));
    }
}
