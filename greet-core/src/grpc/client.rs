//! # gRPC client
//!
//! Wraps a `tonic` client to perform the greet call over gRPC. The channel is created
//! with `connect_lazy`, so building a client never touches the network; the connection
//! is established by the first call and shared by every clone afterwards.
use super::codec::GrpcCodec;
use crate::BoxError;
use crate::codec::ProtoCodec;
use crate::context::CallContext;
use crate::error::Error;
use greet_proto::{GREET_PATH, GreetRequest, GreetResponse};
use http::uri::PathAndQuery;
use http_body::Body as HttpBody;
use std::time::Duration;
use tonic::{
    client::GrpcService,
    transport::{Channel, Endpoint},
};

/// A gRPC client for the greet operation.
#[derive(Debug, Clone)]
pub struct GrpcClient<S = Channel> {
    client: tonic::client::Grpc<S>,
}

impl GrpcClient<Channel> {
    /// Builds a lazily connected client. Must be called inside a Tokio runtime.
    pub fn connect_lazy(base_url: &str, connect_timeout: Duration) -> Result<Self, Error> {
        let endpoint = Endpoint::from_shared(base_url.to_string())
            .map_err(|e| Error::invalid_argument(format!("Invalid URL '{base_url}': {e}")))?
            .connect_timeout(connect_timeout);

        Ok(Self::new(endpoint.connect_lazy()))
    }
}

impl<S> GrpcClient<S>
where
    S: GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        Self { client }
    }

    /// Performs the unary call, propagating the context deadline as `grpc-timeout`.
    pub async fn greet(
        &self,
        ctx: &CallContext,
        message: GreetRequest,
    ) -> Result<GreetResponse, Error> {
        // `tonic::client::Grpc` needs `&mut self`; clones share the same channel.
        let mut client = self.client.clone();

        ctx.run(async move {
            client.ready().await.map_err(|e| {
                let e: BoxError = e.into();
                Error::unavailable(format!("Client was not ready: {e}"))
            })?;

            let mut request = tonic::Request::new(message);
            if let Some(remaining) = ctx.remaining() {
                request.set_timeout(remaining);
            }

            let codec = GrpcCodec::<ProtoCodec, GreetRequest, GreetResponse>::default();
            let path = PathAndQuery::from_static(GREET_PATH);

            client
                .unary(request, path, codec)
                .await
                .map(|response| response.into_inner())
                .map_err(Error::from)
        })
        .await
    }
}
