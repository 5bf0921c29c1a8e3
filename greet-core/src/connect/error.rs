//! Connect error bodies: `{"code": "invalid_argument", "message": "..."}`.
use crate::error::{Code, Error};
use http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    message: String,
}

/// Serializes `err` into the JSON body of a Connect error response.
pub fn to_json(err: &Error) -> Vec<u8> {
    let body = ErrorBody {
        code: err.code().as_str().to_string(),
        message: err.message().to_string(),
    };
    // Serializing two strings cannot fail.
    serde_json::to_vec(&body).unwrap_or_default()
}

/// Rebuilds the error of a non-200 Connect response.
///
/// Falls back to the HTTP status when the body is not a Connect error.
pub fn from_response(status: StatusCode, body: &[u8]) -> Error {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody { code, message }) => Error::new(Code::from_connect_name(&code), message),
        Err(_) => Error::new(
            Code::from_http_status(status),
            format!("HTTP {status}: {}", String::from_utf8_lossy(body)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_round_trips() {
        let err = Error::invalid_argument("unsupported content type");
        let body = to_json(&err);
        assert_eq!(
            body,
            br#"{"code":"invalid_argument","message":"unsupported content type"}"#
        );
        assert_eq!(from_response(StatusCode::BAD_REQUEST, &body), err);
    }

    #[test]
    fn message_is_optional() {
        let err = from_response(StatusCode::SERVICE_UNAVAILABLE, br#"{"code":"unavailable"}"#);
        assert_eq!(err, Error::unavailable(""));
    }

    #[test]
    fn non_connect_bodies_use_the_http_status() {
        let err = from_response(StatusCode::BAD_GATEWAY, b"<html>proxy error</html>");
        assert_eq!(err.code(), Code::Unavailable);
        assert!(err.message().contains("proxy error"));

        let err = from_response(StatusCode::NOT_FOUND, b"");
        assert_eq!(err.code(), Code::Unknown);
    }
}
