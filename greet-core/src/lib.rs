//! # Greet Core
//!
//! `greet-core` exposes one unary operation, `greet.v1.GreetService/Greet`, over three
//! protocol variants served by the same backend on the same HTTP route, and measures
//! how those variants compare.
//!
//! ## Key Components
//!
//! * **[`GreetService`] & [`Greeter`]:** The business function. Bindings call it
//!   identically whatever the wire protocol.
//! * **[`GreetClient`]:** A client bound to a base URL and a [`ProtocolVariant`]
//!   (`Native`, `Grpc` or `Json`). Safe to share between tasks.
//! * **[`ServerHandle`]:** Serves a [`GreetService`] on one route, dispatching each
//!   request to a binding by its `Content-Type`.
//! * **[`bench`]:** Sequential and concurrent benchmark harness with warmup and
//!   availability checks, reporting time and allocations per call.
//!
//! ## Bindings
//!
//! * [`connect`]: Connect unary protocol, instantiated with the protobuf and JSON codecs.
//! * [`grpc`]: gRPC on top of `tonic`, using the same protobuf codec through a
//!   `tonic::codec::Codec` adapter.
//!
//! Every call carries a [`CallContext`]; all failures are an [`Error`] whose [`Code`]
//! does not depend on the variant that produced it.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost` and `tonic`, and the message types of `greet-proto`.
pub mod bench;
pub mod client;
pub mod codec;
pub mod connect;
pub mod context;
pub mod error;
pub mod grpc;
pub mod protocol;
pub mod server;
pub mod service;

pub use client::{ClientOptions, GreetClient};
pub use context::CallContext;
pub use error::{Code, Error};
pub use greet_proto::{GreetRequest, GreetResponse};
pub use protocol::ProtocolVariant;
pub use server::ServerHandle;
pub use service::{GreetService, Greeter};

// Re-exports
pub use prost;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
