//! # Connect client
//!
//! Performs Connect unary calls over a pooled `hyper` HTTP/1.1 client. The pool is
//! internally synchronised, so one [`ConnectClient`] (or any clone of it) can be used
//! from many tasks at once.
use super::{MAX_TIMEOUT_MS, PROTOCOL_VERSION_HEADER, TIMEOUT_HEADER, error};
use crate::codec::Codec;
use crate::context::CallContext;
use crate::error::Error;
use bytes::{Bytes, BytesMut};
use greet_proto::{GreetRequest, GreetResponse};
use http::{Method, Request, StatusCode, Uri, header::CONTENT_TYPE};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ConnectClient<C> {
    codec: C,
    uri: Uri,
    http: Client<HttpConnector, Full<Bytes>>,
}

impl<C: Codec> ConnectClient<C> {
    /// Builds a client posting to `uri`. No connection is opened until the first call.
    pub fn new(uri: Uri, connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let http = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            codec: C::default(),
            uri,
            http,
        }
    }

    pub async fn greet(
        &self,
        ctx: &CallContext,
        message: GreetRequest,
    ) -> Result<GreetResponse, Error> {
        ctx.run(self.send(ctx, message)).await
    }

    async fn send(&self, ctx: &CallContext, message: GreetRequest) -> Result<GreetResponse, Error> {
        let mut body = BytesMut::new();
        self.codec.encode(&message, &mut body)?;

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(self.uri.clone())
            .header(CONTENT_TYPE, C::CONTENT_TYPE)
            .header(PROTOCOL_VERSION_HEADER, "1");
        if let Some(remaining) = ctx.remaining() {
            let millis = remaining.as_millis().clamp(1, MAX_TIMEOUT_MS);
            builder = builder.header(TIMEOUT_HEADER, millis.to_string());
        }
        let request = builder
            .body(Full::new(body.freeze()))
            .map_err(|e| Error::internal(format!("Failed to build request: {e}")))?;

        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| Error::unavailable(format!("Request to '{}' failed: {e}", self.uri)))?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| Error::unavailable(format!("Failed to read response body: {e}")))?
            .to_bytes();

        if parts.status != StatusCode::OK {
            return Err(error::from_response(parts.status, &body));
        }

        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if crate::protocol::ProtocolVariant::from_content_type(content_type)
            .map(|variant| variant.content_type())
            != Some(C::CONTENT_TYPE)
        {
            return Err(Error::invalid_argument(format!(
                "Unexpected response content type '{content_type}', expected '{}'",
                C::CONTENT_TYPE
            )));
        }

        self.codec.decode(body)
    }
}
