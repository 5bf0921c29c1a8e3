//! # gRPC binding
//!
//! The gRPC variant of the greet operation. Framing, trailers and status codes are
//! handled by `tonic`; this module only plugs the shared message codec into it and
//! translates deadlines and errors.
//!
//! * [`client::GrpcClient`]: unary calls over a lazily connected `tonic` channel.
//! * [`service::GrpcGreetService`]: adapter exposing a [`crate::service::GreetService`]
//!   as a `tonic` unary service.
pub mod client;
pub mod codec;
pub mod service;
pub(crate) mod timeout;
