//! # Connect bindings
//!
//! The native (`application/proto`) and JSON (`application/json`) variants share the
//! Connect unary protocol: an HTTP `POST` whose body is the encoded message, answered
//! with `200 OK` and the encoded response, or with a JSON error body and an HTTP status
//! derived from the error code.
//!
//! Both bindings are the same code instantiated with a different [`crate::codec::Codec`].
pub mod client;
pub mod error;
pub mod handler;

/// Header announcing the Connect protocol version.
pub const PROTOCOL_VERSION_HEADER: &str = "connect-protocol-version";

/// Header carrying the call timeout, in milliseconds.
pub const TIMEOUT_HEADER: &str = "connect-timeout-ms";

/// Connect limits the timeout header to 10 digits.
pub(crate) const MAX_TIMEOUT_MS: u128 = 9_999_999_999;
