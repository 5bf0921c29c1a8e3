//! # Greet client
//!
//! [`GreetClient`] is the protocol-agnostic handle callers use to invoke the greet
//! operation. The protocol variant is chosen once, at construction, and selects one of
//! three bindings:
//!
//! | Variant  | Binding                                   |
//! |----------|-------------------------------------------|
//! | `Native` | Connect unary call, protobuf body         |
//! | `Json`   | Connect unary call, JSON body             |
//! | `Grpc`   | gRPC call over a lazily connected channel |
//!
//! Clients are cheap to clone and safe to share between tasks; clones reuse the same
//! connection pool.
//!
//! ## Example
//!
//! ```rust,no_run
//! use greet_core::client::GreetClient;
//! use greet_core::{CallContext, GreetRequest, ProtocolVariant};
//!
//! # async fn run() -> Result<(), greet_core::Error> {
//! let client = GreetClient::new("http://127.0.0.1:8080", ProtocolVariant::Grpc)?;
//! let response = client
//!     .greet(&CallContext::background(), GreetRequest::new("World"))
//!     .await?;
//! assert_eq!(response.greeting, "Hello, World!");
//! # Ok(())
//! # }
//! ```
use crate::codec::{JsonCodec, ProtoCodec};
use crate::connect::client::ConnectClient;
use crate::context::CallContext;
use crate::error::Error;
use crate::grpc::client::GrpcClient;
use crate::protocol::ProtocolVariant;
use greet_proto::{GREET_PATH, GreetRequest, GreetResponse};
use http::Uri;
use std::time::Duration;

/// Default base URL of a standalone server.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

/// Environment variable overriding [`DEFAULT_SERVER_URL`].
pub const SERVER_URL_ENV: &str = "SERVER_URL";

/// Base URL from `SERVER_URL`, or [`DEFAULT_SERVER_URL`] when unset or empty.
pub fn server_url_from_env() -> String {
    std::env::var(SERVER_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
}

/// Options applied to every call made by a [`GreetClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Deadline applied to calls whose context carries none.
    pub timeout: Option<Duration>,
    /// Bound on establishing a TCP connection.
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
enum Binding {
    Native(ConnectClient<ProtoCodec>),
    Json(ConnectClient<JsonCodec>),
    Grpc(GrpcClient),
}

/// A client bound to a server address and a protocol variant.
#[derive(Debug, Clone)]
pub struct GreetClient {
    variant: ProtocolVariant,
    base_url: String,
    timeout: Option<Duration>,
    binding: Binding,
}

impl GreetClient {
    /// Builds a client with default options. Must be called inside a Tokio runtime.
    ///
    /// `base_url` must be an absolute `http` or `https` URL. No connection is attempted.
    pub fn new(base_url: &str, variant: ProtocolVariant) -> Result<Self, Error> {
        Self::with_options(base_url, variant, ClientOptions::default())
    }

    pub fn with_options(
        base_url: &str,
        variant: ProtocolVariant,
        options: ClientOptions,
    ) -> Result<Self, Error> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let uri = greet_uri(&base_url)?;

        let binding = match variant {
            ProtocolVariant::Native => {
                Binding::Native(ConnectClient::new(uri, options.connect_timeout))
            }
            ProtocolVariant::Json => Binding::Json(ConnectClient::new(uri, options.connect_timeout)),
            ProtocolVariant::Grpc => {
                Binding::Grpc(GrpcClient::connect_lazy(&base_url, options.connect_timeout)?)
            }
        };

        Ok(Self {
            variant,
            base_url,
            timeout: options.timeout,
            binding,
        })
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Calls the greet operation.
    ///
    /// The call fails with `Cancelled` or `DeadlineExceeded` as soon as `ctx` is
    /// cancelled or expires, including before anything is sent.
    pub async fn greet(
        &self,
        ctx: &CallContext,
        request: GreetRequest,
    ) -> Result<GreetResponse, Error> {
        let tightened;
        let ctx = match self.timeout {
            Some(timeout) if ctx.deadline().is_none() => {
                tightened = ctx.tightened(timeout);
                &tightened
            }
            _ => ctx,
        };

        match &self.binding {
            Binding::Native(client) => client.greet(ctx, request).await,
            Binding::Json(client) => client.greet(ctx, request).await,
            Binding::Grpc(client) => client.greet(ctx, request).await,
        }
    }
}

/// Validates `base_url` and appends the greet path to it.
fn greet_uri(base_url: &str) -> Result<Uri, Error> {
    let invalid = |reason: &str| Error::invalid_argument(format!("Invalid URL '{base_url}': {reason}"));

    let base: Uri = base_url.parse().map_err(|e| invalid(&format!("{e}")))?;
    match base.scheme_str() {
        Some("http") | Some("https") => {}
        Some(_) => return Err(invalid("scheme must be http or https")),
        None => return Err(invalid("missing scheme")),
    }
    if base.authority().is_none() {
        return Err(invalid("missing host"));
    }
    if base.query().is_some() {
        return Err(invalid("query strings are not allowed"));
    }

    format!("{base_url}{GREET_PATH}")
        .parse()
        .map_err(|e| invalid(&format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Code;

    #[test]
    fn appends_the_greet_path() {
        let uri = greet_uri("http://127.0.0.1:8080").unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:8080/greet.v1.GreetService/Greet");

        let uri = greet_uri("https://example.com/api").unwrap();
        assert_eq!(uri.path(), "/api/greet.v1.GreetService/Greet");
    }

    #[test]
    fn rejects_invalid_urls() {
        for url in ["", "127.0.0.1:8080", "ftp://example.com", "not a url", "http://host/?q=1"] {
            let err = greet_uri(url).unwrap_err();
            assert_eq!(err.code(), Code::InvalidArgument, "{url}");
        }
    }

    #[tokio::test]
    async fn construction_does_not_connect() {
        // Nothing listens on port 9 (discard) on loopback in test environments, and
        // construction must succeed regardless.
        for variant in ProtocolVariant::ALL {
            let client = GreetClient::new("http://127.0.0.1:9/", variant).unwrap();
            assert_eq!(client.variant(), variant);
            assert_eq!(client.base_url(), "http://127.0.0.1:9");
        }
    }

    #[tokio::test]
    async fn invalid_url_fails_for_every_variant() {
        for variant in ProtocolVariant::ALL {
            let err = GreetClient::new("localhost", variant).unwrap_err();
            assert_eq!(err.code(), Code::InvalidArgument);
        }
    }
}
