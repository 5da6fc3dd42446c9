//! OTP (line-oriented scanner control protocol) implementation.
//!
//! This crate provides the wire-level pieces of OTP: message constants,
//! the ` <|> ` field framing, a bounded line channel usable over any async
//! byte stream, and a controller-side client for tests and tooling.
//!
//! OTP is a textual protocol: every message is one newline-terminated
//! line, and multi-field messages join their fields with the exact
//! separator ` <|> `. The separator includes the surrounding spaces; a
//! bare `<|>` is not a field boundary.

mod client;
mod codec;
mod protocol;

pub use client::OtpClient;
pub use codec::LineChannel;
pub use protocol::*;
