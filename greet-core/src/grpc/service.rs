//! # gRPC server adapter
//!
//! Exposes a [`GreetService`] as a `tonic` unary service. The adapter reads the
//! `grpc-timeout` header into the [`CallContext`] and races the service against it.
use super::codec::GrpcCodec;
use super::timeout::{self, GRPC_TIMEOUT_HEADER};
use crate::codec::ProtoCodec;
use crate::context::CallContext;
use crate::server::MAX_BODY_SIZE;
use crate::service::GreetService;
use greet_proto::{GreetRequest, GreetResponse};
use http::HeaderValue;
use http_body::Body as HttpBody;
use std::sync::Arc;
use tonic::{
    Code, Request, Response, Status,
    codegen::BoxFuture,
    metadata::MetadataMap,
    server::{Grpc, UnaryService},
};

/// `tonic` unary service wrapping a shared [`GreetService`].
pub struct GrpcGreetService<S> {
    inner: Arc<S>,
}

impl<S> GrpcGreetService<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self { inner }
    }
}

impl<S> Clone for GrpcGreetService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: GreetService> UnaryService<GreetRequest> for GrpcGreetService<S> {
    type Response = GreetResponse;
    type Future = BoxFuture<Response<Self::Response>, Status>;

    fn call(&mut self, request: Request<GreetRequest>) -> Self::Future {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let ctx = context_from_metadata(request.metadata());
            let message = request.into_inner();
            let response = ctx.run(inner.greet(&ctx, message)).await?;
            Ok(Response::new(response))
        })
    }
}

const GRPC_STATUS_HEADER: &str = "grpc-status";

/// Serves one gRPC HTTP request with `service`, returning the framed response.
///
/// Requests larger than [`MAX_BODY_SIZE`] fail with `InvalidArgument`, as they do on
/// the Connect bindings.
pub async fn serve_unary<S, B>(
    service: Arc<S>,
    request: http::Request<B>,
) -> http::Response<tonic::body::Body>
where
    S: GreetService,
    B: HttpBody<Data = bytes::Bytes> + Send + 'static,
    B::Error: Into<crate::BoxError> + Send,
{
    let codec = GrpcCodec::<ProtoCodec, GreetResponse, GreetRequest>::default();
    let mut grpc = Grpc::new(codec).max_decoding_message_size(MAX_BODY_SIZE);
    let mut response = grpc.unary(GrpcGreetService::new(service), request).await;

    // tonic rejects an oversized message with a trailers-only OUT_OF_RANGE response.
    let out_of_range = response
        .headers()
        .get(GRPC_STATUS_HEADER)
        .is_some_and(|status| Code::from_bytes(status.as_bytes()) == Code::OutOfRange);
    if out_of_range {
        response.headers_mut().insert(
            GRPC_STATUS_HEADER,
            HeaderValue::from(Code::InvalidArgument as i32),
        );
    }
    response
}

fn context_from_metadata(metadata: &MetadataMap) -> CallContext {
    metadata
        .get(GRPC_TIMEOUT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(timeout::parse)
        .map(CallContext::with_timeout)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_timeout_means_no_deadline() {
        let ctx = context_from_metadata(&MetadataMap::new());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn timeout_header_sets_deadline() {
        let mut metadata = MetadataMap::new();
        metadata.insert(GRPC_TIMEOUT_HEADER, "5S".parse().unwrap());
        let ctx = context_from_metadata(&metadata);
        let remaining = ctx.remaining().unwrap();
        assert!(remaining <= Duration::from_secs(5));
        assert!(remaining > Duration::from_secs(4));
    }

    #[test]
    fn unparseable_timeout_is_ignored() {
        let mut metadata = MetadataMap::new();
        metadata.insert(GRPC_TIMEOUT_HEADER, "soon".parse().unwrap());
        assert!(context_from_metadata(&metadata).deadline().is_none());
    }
}
