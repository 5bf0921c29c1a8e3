//! # Call context
//!
//! A [`CallContext`] travels with every call, on the client and on the server. It
//! carries a cancellation token and an optional deadline; work executed through
//! [`CallContext::run`] is abandoned as soon as either fires.
use crate::error::Error;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl CallContext {
    /// A context that never expires and is never cancelled unless [`CallContext::cancel`] is called.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            token: CancellationToken::new(),
        }
    }

    /// Binds the context to an externally owned cancellation token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Returns a copy whose deadline is the earlier of the current one and `now + timeout`.
    pub fn tightened(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(current) if current <= candidate => current,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
            token: self.token.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The error a call made with this context would fail with right now, if any.
    pub fn err(&self) -> Option<Error> {
        if self.token.is_cancelled() {
            return Some(Error::cancelled("call cancelled"));
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Some(Error::deadline_exceeded("deadline exceeded"))
            }
            _ => None,
        }
    }

    /// Drives `fut` to completion unless the context is cancelled or expires first.
    ///
    /// An already finished context fails immediately without polling `fut`.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::cancelled("call cancelled")),
            _ = expired => Err(Error::deadline_exceeded("deadline exceeded")),
            res = fut => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Code;

    #[tokio::test]
    async fn background_context_runs_to_completion() {
        let ctx = CallContext::background();
        assert!(ctx.err().is_none());
        assert!(ctx.remaining().is_none());
        assert_eq!(ctx.run(async { Ok(7) }).await, Ok(7));
    }

    #[tokio::test]
    async fn expired_context_never_polls_the_future() {
        let ctx = CallContext::with_timeout(Duration::ZERO);
        let res = ctx
            .run(async { Err::<(), _>(Error::internal("future was polled")) })
            .await;
        assert_eq!(res.unwrap_err().code(), Code::DeadlineExceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_in_flight_work() {
        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        let res = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert_eq!(res.unwrap_err().code(), Code::DeadlineExceeded);
    }

    #[tokio::test]
    async fn cancellation_wins_over_deadline() {
        let ctx = CallContext::with_timeout(Duration::ZERO);
        ctx.cancel();
        assert_eq!(ctx.err().unwrap().code(), Code::Cancelled);
    }

    #[tokio::test]
    async fn cancel_from_another_task_aborts_call() {
        let token = CancellationToken::new();
        let ctx = CallContext::background().with_token(token.clone());
        let canceller = tokio::spawn(async move { token.cancel() });

        let res = ctx
            .run(async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .await;
        canceller.await.unwrap();

        assert_eq!(res.unwrap_err().code(), Code::Cancelled);
    }

    #[tokio::test]
    async fn tightened_keeps_the_earliest_deadline() {
        let ctx = CallContext::with_timeout(Duration::from_millis(10));
        let tightened = ctx.tightened(Duration::from_secs(60));
        assert_eq!(tightened.deadline(), ctx.deadline());

        let loose = CallContext::background().tightened(Duration::from_secs(1));
        assert!(loose.deadline().is_some());
        assert!(loose.remaining().unwrap() <= Duration::from_secs(1));
    }
}
