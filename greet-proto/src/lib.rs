//! # Greet Proto
//!
//! Message contract of the `greet.v1.GreetService/Greet` unary RPC, shared by the
//! server, the clients and the benchmark harness.
//!
//! The messages derive both `prost::Message` (binary protobuf, used by the native and
//! gRPC bindings) and `serde` (JSON binding). Field names and tags match the
//! `greet/v1/greet.proto` schema:
//!
//! ```proto
//! message GreetRequest { string name = 1; }
//! message GreetResponse { string greeting = 1; }
//! service GreetService { rpc Greet(GreetRequest) returns (GreetResponse); }
//! ```

pub mod pb {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Eq, Hash, ::prost::Message, Serialize, Deserialize)]
    pub struct GreetRequest {
        #[prost(string, tag = "1")]
        #[serde(default)]
        pub name: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, Eq, Hash, ::prost::Message, Serialize, Deserialize)]
    pub struct GreetResponse {
        #[prost(string, tag = "1")]
        #[serde(default)]
        pub greeting: ::prost::alloc::string::String,
    }
}

pub use pb::{GreetRequest, GreetResponse};

/// Fully qualified protobuf service name.
pub const SERVICE_NAME: &str = "greet.v1.GreetService";

/// Name of the single method exposed by the service.
pub const METHOD_NAME: &str = "Greet";

/// HTTP path shared by every protocol binding.
pub const GREET_PATH: &str = "/greet.v1.GreetService/Greet";

impl GreetRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl GreetResponse {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn path_is_built_from_service_and_method() {
        assert_eq!(GREET_PATH, format!("/{SERVICE_NAME}/{METHOD_NAME}"));
    }

    #[test]
    fn missing_json_field_defaults_to_empty() {
        let req: GreetRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, GreetRequest::new(""));
    }

    #[test]
    fn request_uses_field_tag_one() {
        // tag 1, wire type 2 (length delimited), length 3
        let bytes = GreetRequest::new("Bob").encode_to_vec();
        assert_eq!(bytes, vec![0x0a, 0x03, b'B', b'o', b'b']);
    }
}
