//! # Connect server handler
//!
//! Serves one Connect unary request: reads the timeout header into a
//! [`CallContext`], decodes the body with the binding's codec, runs the service and
//! encodes the outcome.
use super::{TIMEOUT_HEADER, error};
use crate::codec::Codec;
use crate::context::CallContext;
use crate::error::Error;
use crate::service::GreetService;
use axum::body::Body;
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use greet_proto::{GreetRequest, GreetResponse};
use http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use std::time::Duration;

/// Handles a Connect unary request whose body has already been read.
pub async fn serve_unary<C, S>(codec: C, service: &S, headers: &HeaderMap, body: Bytes) -> Response
where
    C: Codec,
    S: GreetService,
{
    match call(codec, service, headers, body).await {
        Ok(encoded) => http::Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, C::CONTENT_TYPE)
            .body(Body::from(encoded))
            .unwrap_or_else(|_| error_response(&Error::internal("Failed to build response"))),
        Err(err) => {
            tracing::debug!(codec = C::NAME, error = %err, "Connect call failed");
            error_response(&err)
        }
    }
}

async fn call<C, S>(codec: C, service: &S, headers: &HeaderMap, body: Bytes) -> Result<Bytes, Error>
where
    C: Codec,
    S: GreetService,
{
    let ctx = context_from_headers(headers)?;
    let request: GreetRequest = codec.decode(body)?;
    let response: GreetResponse = ctx.run(service.greet(&ctx, request)).await?;

    let mut buf = BytesMut::new();
    codec.encode(&response, &mut buf)?;
    Ok(buf.freeze())
}

/// Builds a Connect error response for `err`.
pub fn error_response(err: &Error) -> Response {
    let mut response = Response::new(Body::from(error::to_json(err)));
    *response.status_mut() = err.code().http_status();
    response.headers_mut().insert(
        CONTENT_TYPE,
        http::HeaderValue::from_static(crate::protocol::CONTENT_TYPE_JSON),
    );
    response
}

fn context_from_headers(headers: &HeaderMap) -> Result<CallContext, Error> {
    let Some(value) = headers.get(TIMEOUT_HEADER) else {
        return Ok(CallContext::background());
    };

    let millis = value
        .to_str()
        .ok()
        .filter(|v| !v.is_empty() && v.len() <= 10)
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| Error::invalid_argument(format!("Invalid {TIMEOUT_HEADER} header")))?;

    Ok(CallContext::with_timeout(Duration::from_millis(millis)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{JsonCodec, ProtoCodec};
    use crate::error::Code;
    use crate::service::Greeter;
    use http_body_util::BodyExt;

    async fn read_body(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn json_call_succeeds() {
        let response = serve_unary(
            JsonCodec,
            &Greeter,
            &HeaderMap::new(),
            Bytes::from_static(br#"{"name":"TestUser"}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            read_body(response).await,
            Bytes::from_static(br#"{"greeting":"Hello, TestUser!"}"#)
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_bad_request() {
        let response = serve_unary(
            ProtoCodec,
            &Greeter,
            &HeaderMap::new(),
            Bytes::from_static(b"\xff"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let err = error::from_response(StatusCode::BAD_REQUEST, &read_body(response).await);
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn zero_timeout_is_deadline_exceeded() {
        let mut headers = HeaderMap::new();
        headers.insert(TIMEOUT_HEADER, "0".parse().unwrap());

        let response = serve_unary(ProtoCodec, &Greeter, &headers, Bytes::new()).await;

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let err = error::from_response(response.status(), &read_body(response).await);
        assert_eq!(err.code(), Code::DeadlineExceeded);
    }

    #[test]
    fn timeout_header_is_validated() {
        let mut headers = HeaderMap::new();
        headers.insert(TIMEOUT_HEADER, "abc".parse().unwrap());
        assert_eq!(
            context_from_headers(&headers).unwrap_err().code(),
            Code::InvalidArgument
        );

        headers.insert(TIMEOUT_HEADER, "12345678901".parse().unwrap());
        assert!(context_from_headers(&headers).is_err());
    }
}
