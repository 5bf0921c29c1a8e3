//! # Error taxonomy
//!
//! Every failure surfaced by a binding, the service or the client is an [`Error`]
//! carrying one of the [`Code`]s below. The taxonomy maps 1:1 to gRPC status codes and
//! to Connect error codes, so the observable error of a call does not depend on the
//! protocol variant used to transport it.
use http::StatusCode;
use std::fmt;

/// Error classes shared by all protocol bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// The call was cancelled by the caller.
    Cancelled,
    /// Malformed or undecodable request/response, or unsupported content type.
    InvalidArgument,
    /// The call deadline expired before a response was produced.
    DeadlineExceeded,
    /// Unexpected failure inside the service.
    Internal,
    /// The server could not be reached.
    Unavailable,
    /// A remote error that does not belong to any other class.
    Unknown,
}

impl Code {
    /// Connect protocol name of the code (`invalid_argument`, `unavailable`...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Cancelled => "canceled",
            Code::InvalidArgument => "invalid_argument",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::Unknown => "unknown",
        }
    }

    /// Parses a Connect code name. Unrecognised names map to [`Code::Unknown`].
    pub fn from_connect_name(name: &str) -> Self {
        match name {
            "canceled" => Code::Cancelled,
            "invalid_argument" => Code::InvalidArgument,
            "deadline_exceeded" => Code::DeadlineExceeded,
            "internal" => Code::Internal,
            "unavailable" => Code::Unavailable,
            _ => Code::Unknown,
        }
    }

    /// HTTP status used by the Connect bindings when returning this code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 499 Client Closed Request has no constant in `http`.
            Code::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
            Code::InvalidArgument => StatusCode::BAD_REQUEST,
            Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Code::Internal | Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Infers a code from the HTTP status of a Connect response without an error body.
    pub fn from_http_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 | 415 => Code::InvalidArgument,
            408 | 504 => Code::DeadlineExceeded,
            499 => Code::Cancelled,
            502 | 503 => Code::Unavailable,
            _ => Code::Unknown,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tonic::Code> for Code {
    fn from(code: tonic::Code) -> Self {
        match code {
            tonic::Code::Cancelled => Code::Cancelled,
            // tonic reports messages over the decoding limit as OutOfRange.
            tonic::Code::InvalidArgument | tonic::Code::OutOfRange => Code::InvalidArgument,
            tonic::Code::DeadlineExceeded => Code::DeadlineExceeded,
            tonic::Code::Internal => Code::Internal,
            tonic::Code::Unavailable => Code::Unavailable,
            _ => Code::Unknown,
        }
    }
}

impl From<Code> for tonic::Code {
    fn from(code: Code) -> Self {
        match code {
            Code::Cancelled => tonic::Code::Cancelled,
            Code::InvalidArgument => tonic::Code::InvalidArgument,
            Code::DeadlineExceeded => tonic::Code::DeadlineExceeded,
            Code::Internal => tonic::Code::Internal,
            Code::Unavailable => tonic::Code::Unavailable,
            Code::Unknown => tonic::Code::Unknown,
        }
    }
}

/// Error returned by every greet call, whatever the protocol variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct Error {
    code: Code,
    message: String,
}

impl Error {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Code::Cancelled, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(Code::DeadlineExceeded, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        Self::new(status.code().into(), status.message())
    }
}

impl From<Error> for tonic::Status {
    fn from(err: Error) -> Self {
        tonic::Status::new(err.code.into(), err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Code; 6] = [
        Code::Cancelled,
        Code::InvalidArgument,
        Code::DeadlineExceeded,
        Code::Internal,
        Code::Unavailable,
        Code::Unknown,
    ];

    #[test]
    fn tonic_codes_map_one_to_one() {
        for code in ALL {
            assert_eq!(Code::from(tonic::Code::from(code)), code);
        }
    }

    #[test]
    fn connect_names_map_one_to_one() {
        for code in ALL {
            assert_eq!(Code::from_connect_name(code.as_str()), code);
        }
        assert_eq!(Code::from_connect_name("resource_exhausted"), Code::Unknown);
    }

    #[test]
    fn unmapped_tonic_codes_are_unknown() {
        assert_eq!(Code::from(tonic::Code::NotFound), Code::Unknown);
        assert_eq!(Code::from(tonic::Code::Aborted), Code::Unknown);
    }

    #[test]
    fn decode_limit_is_invalid_argument() {
        let status = tonic::Status::out_of_range("decoded message length too large");
        assert_eq!(Error::from(status).code(), Code::InvalidArgument);
    }

    #[test]
    fn http_status_round_trips_for_connect_codes() {
        for code in [
            Code::Cancelled,
            Code::InvalidArgument,
            Code::DeadlineExceeded,
            Code::Unavailable,
        ] {
            assert_eq!(Code::from_http_status(code.http_status()), code);
        }
        assert_eq!(
            Code::from_http_status(StatusCode::UNSUPPORTED_MEDIA_TYPE),
            Code::InvalidArgument
        );
    }

    #[test]
    fn status_conversion_keeps_message() {
        let err = Error::from(tonic::Status::invalid_argument("bad body"));
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(err.message(), "bad body");
        assert_eq!(err.to_string(), "invalid_argument: bad body");

        let status = tonic::Status::from(Error::deadline_exceeded("too slow"));
        assert_eq!(status.code(), tonic::Code::DeadlineExceeded);
        assert_eq!(status.message(), "too slow");
    }
}
