//! # Greet service
//!
//! The business function behind every protocol binding. Bindings decode a
//! [`GreetRequest`], call [`GreetService::greet`] and encode whatever it returns; the
//! protocol in use never reaches this layer.
use crate::context::CallContext;
use crate::error::Error;
use greet_proto::{GreetRequest, GreetResponse};

#[tonic::async_trait]
pub trait GreetService: Send + Sync + 'static {
    async fn greet(
        &self,
        ctx: &CallContext,
        request: GreetRequest,
    ) -> Result<GreetResponse, Error>;
}

/// The default, side-effect free implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Greeter;

#[tonic::async_trait]
impl GreetService for Greeter {
    async fn greet(
        &self,
        ctx: &CallContext,
        request: GreetRequest,
    ) -> Result<GreetResponse, Error> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        Ok(GreetResponse {
            greeting: greeting_for(&request.name),
        })
    }
}

/// `"Hello, " + name + "!"`.
pub fn greeting_for(name: &str) -> String {
    let mut greeting = String::with_capacity(name.len() + 8);
    greeting.push_str("Hello, ");
    greeting.push_str(name);
    greeting.push('!');
    greeting
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Code;
    use std::time::Duration;

    #[tokio::test]
    async fn greets_by_name() {
        let res = Greeter
            .greet(&CallContext::background(), GreetRequest::new("TestUser"))
            .await
            .unwrap();
        assert_eq!(res.greeting, "Hello, TestUser!");
    }

    #[tokio::test]
    async fn accepts_any_name() {
        for name in ["", "Zoë", "名前", "tab\tand\nnewline", "\u{0}"] {
            let res = Greeter
                .greet(&CallContext::background(), GreetRequest::new(name))
                .await
                .unwrap();
            assert_eq!(res.greeting, format!("Hello, {name}!"));
        }
    }

    #[tokio::test]
    async fn is_idempotent() {
        let ctx = CallContext::background();
        let first = Greeter.greet(&ctx, GreetRequest::new("again")).await;
        let second = Greeter.greet(&ctx, GreetRequest::new("again")).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn propagates_expired_context() {
        let ctx = CallContext::with_timeout(Duration::ZERO);
        let err = Greeter
            .greet(&ctx, GreetRequest::new("late"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::DeadlineExceeded);
    }

    #[tokio::test]
    async fn propagates_cancelled_context() {
        let ctx = CallContext::background();
        ctx.cancel();
        let err = Greeter
            .greet(&ctx, GreetRequest::new("gone"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::Cancelled);
    }
}
