//! # toolsocket-protocol
//!
//! Message model and wire codec for the toolsocket text protocol — a
//! lightweight request/response messaging format carried over a
//! persistent bidirectional socket.
//!
//! A frame is one newline-terminated text unit encoding exactly one
//! message: a literal signature line, `name:value` header lines, and an
//! optional terminal JSON payload section. See [`codec`] for the exact
//! format and the decode state machine.
//!
//! This crate is synchronous and does no I/O; the session and dispatch
//! layers live in `toolsocket-client`.

#![deny(unsafe_code)]

pub mod codec;
pub mod counter;
pub mod errors;
pub mod message;

pub use codec::{SIGNATURE, decode, encode};
pub use counter::MessageIdCounter;
pub use errors::FrameDefect;
pub use message::{InboundMessage, OutboundMessage};
