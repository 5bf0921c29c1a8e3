//! # Greet server
//!
//! Hosts a [`GreetService`] on a single route, `POST /greet.v1.GreetService/Greet`,
//! answering all three protocol variants. The variant of each request is chosen from
//! its `Content-Type` header; requests no binding understands are rejected with an
//! `invalid_argument` error before the service is reached.
//!
//! The server speaks HTTP/1.1 and HTTP/2 (prior knowledge) on the same socket, which
//! lets Connect clients and gRPC clients share one listener. Browser clients are served
//! too: gRPC-Web requests are translated to gRPC by `tonic-web`, and CORS preflights are
//! answered for any origin.
use crate::codec::{JsonCodec, ProtoCodec};
use crate::connect::handler as connect;
use crate::error::Error;
use crate::grpc::service as grpc;
use crate::protocol::{self, ProtocolVariant};
use crate::service::GreetService;
use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    response::{IntoResponse, Response},
    routing::post,
};
use greet_proto::GREET_PATH;
use http::{HeaderName, Method, StatusCode, header::CONTENT_TYPE};
use std::{convert::Infallible, io, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tonic_web::GrpcWebLayer;
use tower::{Layer, ServiceExt};
use tower_http::cors::{Any, CorsLayer};

/// Connect request bodies larger than this are rejected.
pub const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// How long [`ServerHandle::shutdown`] waits for open connections to drain.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// How long browsers may cache a preflight answer.
const CORS_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Builds the router exposing `service` on the greet route.
pub fn router<S: GreetService>(service: S) -> Router {
    Router::new()
        .route(GREET_PATH, post(dispatch::<S>))
        .with_state(Arc::new(service))
        .layer(cors())
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST])
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static("grpc-status"),
            HeaderName::from_static("grpc-message"),
            HeaderName::from_static("grpc-status-details-bin"),
        ])
        .max_age(CORS_MAX_AGE)
}

async fn dispatch<S: GreetService>(State(service): State<Arc<S>>, request: Request) -> Response {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if protocol::is_grpc_web(content_type) {
        return serve_grpc_web(service, request).await;
    }

    let Some(variant) = ProtocolVariant::from_content_type(content_type) else {
        tracing::debug!(content_type, "Rejected request with unsupported content type");
        let err = Error::invalid_argument(format!("Unsupported content type '{content_type}'"));
        let mut response = connect::error_response(&err);
        *response.status_mut() = StatusCode::UNSUPPORTED_MEDIA_TYPE;
        return response;
    };

    match variant {
        ProtocolVariant::Grpc => grpc::serve_unary(service, request)
            .await
            .map(Body::new)
            .into_response(),
        ProtocolVariant::Native => serve_connect(ProtoCodec, &*service, request).await,
        ProtocolVariant::Json => serve_connect(JsonCodec, &*service, request).await,
    }
}

/// Unwraps a gRPC-Web request into plain gRPC and frames the answer back for the browser.
async fn serve_grpc_web<S: GreetService>(service: Arc<S>, request: Request) -> Response {
    let inner = tower::service_fn(move |request: http::Request<tonic::body::Body>| {
        let service = Arc::clone(&service);
        async move { Ok::<_, Infallible>(grpc::serve_unary(service, request).await) }
    });

    match GrpcWebLayer::new().layer(inner).oneshot(request).await {
        Ok(response) => response.map(Body::new).into_response(),
        Err(never) => match never {},
    }
}

async fn serve_connect<C, S>(codec: C, service: &S, request: Request) -> Response
where
    C: crate::codec::Codec,
    S: GreetService,
{
    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, MAX_BODY_SIZE).await {
        Ok(bytes) => connect::serve_unary(codec, service, &parts.headers, bytes).await,
        Err(e) => connect::error_response(&Error::invalid_argument(format!(
            "Failed to read request body: {e}"
        ))),
    }
}

/// A running server bound to a local socket.
///
/// Dropping the handle stops the server; [`ServerHandle::shutdown`] does the same and
/// waits for it to finish.
pub struct ServerHandle {
    local_addr: SocketAddr,
    token: CancellationToken,
    task: Option<JoinHandle<io::Result<()>>>,
}

impl ServerHandle {
    /// Binds `addr` (use port 0 for an ephemeral port) and serves `service` on it.
    pub async fn bind<S: GreetService>(service: S, addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Self::from_listener(service, listener)
    }

    /// Serves `service` on an ephemeral loopback port.
    pub async fn ephemeral<S: GreetService>(service: S) -> io::Result<Self> {
        Self::bind(service, SocketAddr::from(([127, 0, 0, 1], 0))).await
    }

    pub fn from_listener<S: GreetService>(service: S, listener: TcpListener) -> io::Result<Self> {
        let local_addr = listener.local_addr()?;
        let token = CancellationToken::new();

        let serve = axum::serve(listener, router(service))
            .with_graceful_shutdown(token.clone().cancelled_owned());
        let task = tokio::spawn(async move { serve.await });

        tracing::info!(%local_addr, "Greet server listening");

        Ok(Self {
            local_addr,
            token,
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL clients should use, e.g. `http://127.0.0.1:41234`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Completes when the server stops, either on its own or after a shutdown request.
    pub async fn wait(mut self) -> io::Result<()> {
        match self.task.take() {
            Some(task) => task.await.map_err(io::Error::other)?,
            None => Ok(()),
        }
    }

    /// Stops accepting connections and waits for open ones to drain.
    ///
    /// Connections still open after a grace period are dropped.
    pub async fn shutdown(mut self) -> io::Result<()> {
        self.token.cancel();
        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        let res = match tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, &mut task).await {
            Ok(joined) => joined.map_err(io::Error::other)?,
            Err(_) => {
                tracing::warn!(local_addr = %self.local_addr, "Graceful shutdown timed out, aborting");
                task.abort();
                Ok(())
            }
        };
        tracing::info!(local_addr = %self.local_addr, "Greet server stopped");
        res
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
