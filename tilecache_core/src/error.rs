//! Failure kinds that callers have to tell apart.
//!
//! Everything else (I/O faults, configuration problems) is reported through `anyhow`.

use thiserror::Error;

/// The tile server could not be reached at all (connection refused, host unreachable).
///
/// Unlike timeouts or unexpected status codes this means that further requests
/// will most likely fail as well, so the whole resolution is aborted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("connection to '{url}' failed: {message}")]
pub struct ConnectionFailed {
	pub url: String,
	pub message: String,
}

/// Failure of the HTTP client capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
	/// No connection could be established.
	#[error("connect error: {0}")]
	Connect(String),
	/// Timeouts, malformed responses, body read errors.
	#[error("transport error: {0}")]
	Other(String),
}

/// Failure of a tile source's decoder.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
	/// Decoding needs more memory than is available or allowed.
	#[error("insufficient memory to decode tile: {0}")]
	InsufficientMemory(String),
	/// The bytes are not a valid image.
	#[error("corrupt tile content: {0}")]
	Corrupt(String),
}
