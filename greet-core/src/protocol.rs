//! # Protocol variants
//!
//! The three bindings under which the greet operation is exposed, and the content
//! types used to tell them apart on the shared route.
//!
//! Browsers reach the gRPC binding through gRPC-Web, which the server translates before
//! dispatching; it is not a client variant of its own.
use std::fmt;
use std::str::FromStr;

pub const CONTENT_TYPE_PROTO: &str = "application/proto";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_GRPC: &str = "application/grpc";
pub const CONTENT_TYPE_GRPC_PROTO: &str = "application/grpc+proto";
pub const CONTENT_TYPE_GRPC_WEB: &str = "application/grpc-web";
pub const CONTENT_TYPE_GRPC_WEB_PROTO: &str = "application/grpc-web+proto";
pub const CONTENT_TYPE_GRPC_WEB_TEXT: &str = "application/grpc-web-text";
pub const CONTENT_TYPE_GRPC_WEB_TEXT_PROTO: &str = "application/grpc-web-text+proto";

/// Wire protocol selected once per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolVariant {
    /// Connect unary call with a binary protobuf body.
    #[default]
    Native,
    /// gRPC over HTTP/2, status carried in trailers.
    Grpc,
    /// Connect unary call with a JSON body.
    Json,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown protocol '{0}', expected one of: native, grpc, json")]
pub struct ParseProtocolError(String);

impl ProtocolVariant {
    pub const ALL: [ProtocolVariant; 3] = [
        ProtocolVariant::Native,
        ProtocolVariant::Grpc,
        ProtocolVariant::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolVariant::Native => "native",
            ProtocolVariant::Grpc => "grpc",
            ProtocolVariant::Json => "json",
        }
    }

    /// Content type sent by clients of this variant.
    pub fn content_type(&self) -> &'static str {
        match self {
            ProtocolVariant::Native => CONTENT_TYPE_PROTO,
            ProtocolVariant::Grpc => CONTENT_TYPE_GRPC,
            ProtocolVariant::Json => CONTENT_TYPE_JSON,
        }
    }

    /// Resolves the variant of an incoming request from its `Content-Type` header.
    ///
    /// Parameters such as `; charset=utf-8` are ignored and the comparison is case
    /// insensitive. Returns `None` for content types no binding understands.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match media_type(content_type).as_str() {
            CONTENT_TYPE_PROTO => Some(ProtocolVariant::Native),
            CONTENT_TYPE_JSON => Some(ProtocolVariant::Json),
            CONTENT_TYPE_GRPC | CONTENT_TYPE_GRPC_PROTO => Some(ProtocolVariant::Grpc),
            _ => None,
        }
    }
}

/// Whether `content_type` is a gRPC-Web request, binary or base64 text.
pub fn is_grpc_web(content_type: &str) -> bool {
    matches!(
        media_type(content_type).as_str(),
        CONTENT_TYPE_GRPC_WEB
            | CONTENT_TYPE_GRPC_WEB_PROTO
            | CONTENT_TYPE_GRPC_WEB_TEXT
            | CONTENT_TYPE_GRPC_WEB_TEXT_PROTO
    )
}

/// Lowercase media type without parameters such as `; charset=utf-8`.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVariant {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "connect" | "proto" => Ok(ProtocolVariant::Native),
            "grpc" => Ok(ProtocolVariant::Grpc),
            "json" => Ok(ProtocolVariant::Json),
            _ => Err(ParseProtocolError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_native() {
        assert_eq!(ProtocolVariant::default(), ProtocolVariant::Native);
    }

    #[test]
    fn content_type_dispatch() {
        assert_eq!(
            ProtocolVariant::from_content_type("application/proto"),
            Some(ProtocolVariant::Native)
        );
        assert_eq!(
            ProtocolVariant::from_content_type("Application/JSON; charset=utf-8"),
            Some(ProtocolVariant::Json)
        );
        assert_eq!(
            ProtocolVariant::from_content_type("application/grpc+proto"),
            Some(ProtocolVariant::Grpc)
        );
        assert_eq!(ProtocolVariant::from_content_type("text/plain"), None);
        assert_eq!(ProtocolVariant::from_content_type(""), None);
        assert_eq!(ProtocolVariant::from_content_type("application/grpc+json"), None);
    }

    #[test]
    fn grpc_web_is_recognised() {
        assert!(is_grpc_web("application/grpc-web"));
        assert!(is_grpc_web("application/grpc-web+proto"));
        assert!(is_grpc_web("Application/gRPC-Web-Text; charset=utf-8"));
        assert!(!is_grpc_web("application/grpc"));
        assert!(!is_grpc_web("application/grpc-web+json"));
        assert_eq!(ProtocolVariant::from_content_type("application/grpc-web+proto"), None);
    }

    #[test]
    fn every_variant_dispatches_to_itself() {
        for variant in ProtocolVariant::ALL {
            assert_eq!(
                ProtocolVariant::from_content_type(variant.content_type()),
                Some(variant)
            );
        }
    }

    #[test]
    fn parses_names() {
        for variant in ProtocolVariant::ALL {
            assert_eq!(variant.to_string().parse::<ProtocolVariant>(), Ok(variant));
        }
        assert_eq!("GRPC".parse::<ProtocolVariant>(), Ok(ProtocolVariant::Grpc));
        assert!("thrift".parse::<ProtocolVariant>().is_err());
    }
}
