//! # Benchmark harness
//!
//! Measures the greet call for one `(mode, variant, target)` combination at a time:
//!
//! * **mode**: [`Mode::Sequential`] issues calls one after another, [`Mode::Concurrent`]
//!   splits them across workers sharing a single client.
//! * **variant**: any [`ProtocolVariant`].
//! * **target**: an ephemeral [`Target::InProcess`] server started for the run, or an
//!   already running [`Target::External`] server.
//!
//! A run has three phases:
//!
//! 1. **Setup** (untimed): start or address the server, build the client and issue
//!    `warmup_calls` calls. A failed warmup against an external server means the server
//!    is absent and the run is reported as [`BenchOutcome::Skipped`]. A failed warmup
//!    against the in-process server is a [`BenchError::Warmup`].
//! 2. **Timing**: the clock starts and an allocation snapshot is taken, then every call
//!    is issued and its greeting verified. Any failure is a hard [`BenchError`].
//! 3. **Report**: elapsed time and allocation deltas become a [`BenchReport`].
//!
//! All settings live in a [`BenchConfig`] passed to [`run`]; the harness keeps no state
//! between runs.
pub mod alloc;
mod report;

pub use report::{BenchReport, label};

use crate::client::{ClientOptions, GreetClient, server_url_from_env};
use crate::context::CallContext;
use crate::error::Error;
use crate::protocol::ProtocolVariant;
use crate::server::ServerHandle;
use crate::service::{GreetService, Greeter, greeting_for};
use self::alloc::AllocationSnapshot;
use greet_proto::GreetRequest;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::Instrument;

pub const DEFAULT_WARMUP_CALLS: usize = 10;
pub const DEFAULT_ITERATIONS: u64 = 10_000;
pub const DEFAULT_NAME: &str = "BenchUser";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Sequential,
    Concurrent,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown mode '{0}', expected one of: sequential, concurrent")]
pub struct ParseModeError(String);

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Sequential, Mode::Concurrent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Sequential => "sequential",
            Mode::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Mode::Sequential),
            "concurrent" | "parallel" => Ok(Mode::Concurrent),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Where the measured server runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A server started on an ephemeral loopback port for the duration of the run.
    InProcess,
    /// An already running server at the given base URL.
    External(String),
}

impl Target {
    /// External target at `SERVER_URL`, or the default server URL.
    pub fn external_from_env() -> Self {
        Target::External(server_url_from_env())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Target::InProcess => "in-process",
            Target::External(_) => "external",
        }
    }
}

/// Settings of a single benchmark run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub mode: Mode,
    pub variant: ProtocolVariant,
    pub target: Target,
    /// Untimed calls issued before measuring.
    pub warmup_calls: usize,
    /// Calls issued during the timed phase, across all workers.
    pub iterations: u64,
    /// Worker tasks in concurrent mode. Ignored in sequential mode.
    pub workers: usize,
    /// Name sent in every request; concurrent workers append their index to it.
    pub name: String,
    /// Deadline of each call.
    pub call_timeout: Option<Duration>,
}

impl BenchConfig {
    pub fn new(mode: Mode, variant: ProtocolVariant, target: Target) -> Self {
        Self {
            mode,
            variant,
            target,
            warmup_calls: DEFAULT_WARMUP_CALLS,
            iterations: DEFAULT_ITERATIONS,
            workers: default_workers(),
            name: DEFAULT_NAME.to_string(),
            call_timeout: None,
        }
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_warmup_calls(mut self, warmup_calls: usize) -> Self {
        self.warmup_calls = warmup_calls;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn label(&self) -> String {
        label(self.variant, self.mode, &self.target)
    }

    /// Workers that issue at least one call.
    fn effective_workers(&self) -> usize {
        match self.mode {
            Mode::Sequential => 1,
            Mode::Concurrent => {
                let iterations = usize::try_from(self.iterations).unwrap_or(usize::MAX);
                self.workers.min(iterations)
            }
        }
    }
}

/// Every `(mode, variant)` combination against `target`, each cloned from `template`.
pub fn matrix(
    modes: &[Mode],
    variants: &[ProtocolVariant],
    target: &Target,
    template: &BenchConfig,
) -> Vec<BenchConfig> {
    modes
        .iter()
        .flat_map(|&mode| {
            variants.iter().map(move |&variant| BenchConfig {
                mode,
                variant,
                target: target.clone(),
                ..template.clone()
            })
        })
        .collect()
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Result of a run that did not fail.
#[derive(Debug, Clone)]
pub enum BenchOutcome {
    Completed(BenchReport),
    /// The external server could not be reached during warmup.
    Skipped { label: String, reason: Error },
}

impl BenchOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, BenchOutcome::Skipped { .. })
    }

    pub fn report(&self) -> Option<&BenchReport> {
        match self {
            BenchOutcome::Completed(report) => Some(report),
            BenchOutcome::Skipped { .. } => None,
        }
    }
}

impl fmt::Display for BenchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchOutcome::Completed(report) => fmt::Display::fmt(report, f),
            BenchOutcome::Skipped { label, reason } => {
                write!(f, "--- SKIP: {label}: server not available: {reason}")
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("Invalid benchmark configuration: {0}")]
    Config(String),
    #[error("Failed to start the in-process server: '{0}'")]
    Server(#[source] std::io::Error),
    #[error("Failed to build the client: '{0}'")]
    Client(#[source] Error),
    #[error("Warmup call {call} against the in-process server failed: '{source}'")]
    Warmup { call: usize, source: Error },
    #[error("Worker {worker} call failed after {completed} successful calls: '{source}'")]
    Call {
        worker: usize,
        completed: u64,
        source: Error,
    },
    #[error("Worker {worker} received '{actual}', expected '{expected}'")]
    Mismatch {
        worker: usize,
        expected: String,
        actual: String,
    },
    #[error("Benchmark worker did not complete: '{0}'")]
    Worker(#[source] tokio::task::JoinError),
}

/// Runs one benchmark scenario, serving [`Greeter`] for the in-process target.
///
/// Concurrent mode spawns its workers on the current runtime; use a multi-threaded
/// runtime to measure actual parallelism.
pub async fn run(config: &BenchConfig) -> Result<BenchOutcome, BenchError> {
    run_with_service(config, Greeter).await
}

/// Like [`run`], but the in-process server hosts `service`.
///
/// `service` is unused for an external target.
pub async fn run_with_service<S: GreetService>(
    config: &BenchConfig,
    service: S,
) -> Result<BenchOutcome, BenchError> {
    let span = tracing::info_span!("bench", label = %config.label());
    run_inner(config, service).instrument(span).await
}

/// Runs every scenario in order and pairs each result with its label.
pub async fn run_suite(
    configs: &[BenchConfig],
) -> Vec<(String, Result<BenchOutcome, BenchError>)> {
    let mut results = Vec::with_capacity(configs.len());
    for config in configs {
        results.push((config.label(), run(config).await));
    }
    results
}

async fn run_inner<S: GreetService>(
    config: &BenchConfig,
    service: S,
) -> Result<BenchOutcome, BenchError> {
    validate(config)?;

    let (server, base_url) = match &config.target {
        Target::InProcess => {
            let server = ServerHandle::ephemeral(service)
                .await
                .map_err(BenchError::Server)?;
            let base_url = server.base_url();
            (Some(server), base_url)
        }
        Target::External(url) => (None, url.clone()),
    };

    let mut options = ClientOptions::default();
    if let Some(timeout) = config.call_timeout {
        options = options.with_timeout(timeout);
    }
    let client = GreetClient::with_options(&base_url, config.variant, options)
        .map_err(BenchError::Client)?;
    let client = Arc::new(client);

    if let Err((call, reason)) = warmup(&client, config).await {
        return match config.target {
            Target::External(_) => {
                tracing::warn!(%base_url, error = %reason, "Server not available, skipping");
                Ok(BenchOutcome::Skipped {
                    label: config.label(),
                    reason,
                })
            }
            Target::InProcess => Err(BenchError::Warmup {
                call,
                source: reason,
            }),
        };
    }

    let measured = match config.mode {
        Mode::Sequential => measure_sequential(&client, config).await,
        Mode::Concurrent => measure_concurrent(&client, config).await,
    };

    drop(client);
    if let Some(server) = server {
        if let Err(e) = server.shutdown().await {
            tracing::warn!(error = %e, "In-process server did not shut down cleanly");
        }
    }

    let measured = measured?;
    let counted = alloc::is_installed();
    let report = BenchReport {
        mode: config.mode,
        variant: config.variant,
        target: config.target.clone(),
        calls: config.iterations,
        workers: config.effective_workers(),
        elapsed: measured.elapsed,
        allocations: counted.then_some(measured.allocations.allocations),
        allocated_bytes: counted.then_some(measured.allocations.bytes),
    };
    tracing::debug!(ns_per_call = report.nanos_per_call(), "Benchmark completed");
    Ok(BenchOutcome::Completed(report))
}

fn validate(config: &BenchConfig) -> Result<(), BenchError> {
    if config.iterations == 0 {
        return Err(BenchError::Config("iterations must be at least 1".into()));
    }
    if config.mode == Mode::Concurrent && config.workers == 0 {
        return Err(BenchError::Config("workers must be at least 1".into()));
    }
    Ok(())
}

/// Issues the warmup calls, returning the index and error of the first failure.
async fn warmup(client: &GreetClient, config: &BenchConfig) -> Result<(), (usize, Error)> {
    let ctx = CallContext::background();
    let request = GreetRequest::new(config.name.as_str());
    for call in 0..config.warmup_calls {
        client
            .greet(&ctx, request.clone())
            .await
            .map_err(|err| (call, err))?;
    }
    Ok(())
}

struct Measured {
    elapsed: Duration,
    allocations: AllocationSnapshot,
}

async fn measure_sequential(
    client: &GreetClient,
    config: &BenchConfig,
) -> Result<Measured, BenchError> {
    let ctx = CallContext::background();
    let request = GreetRequest::new(config.name.as_str());
    let expected = greeting_for(&config.name);

    let before = AllocationSnapshot::now();
    let start = Instant::now();

    for completed in 0..config.iterations {
        let response = client
            .greet(&ctx, request.clone())
            .await
            .map_err(|source| BenchError::Call {
                worker: 0,
                completed,
                source,
            })?;
        if response.greeting != expected {
            return Err(BenchError::Mismatch {
                worker: 0,
                expected,
                actual: response.greeting,
            });
        }
    }

    Ok(Measured {
        elapsed: start.elapsed(),
        allocations: AllocationSnapshot::now() - before,
    })
}

async fn measure_concurrent(
    client: &Arc<GreetClient>,
    config: &BenchConfig,
) -> Result<Measured, BenchError> {
    let ctx = CallContext::background();
    let streams: Vec<_> = split_calls(config.iterations, config.workers)
        .into_iter()
        .enumerate()
        .filter(|&(_, calls)| calls > 0)
        .map(|(worker, calls)| {
            let name = format!("{}-{worker}", config.name);
            let expected = greeting_for(&name);
            (worker, calls, GreetRequest::new(name), expected)
        })
        .collect();

    let before = AllocationSnapshot::now();
    let start = Instant::now();

    let mut workers = JoinSet::new();
    for (worker, calls, request, expected) in streams {
        let client = Arc::clone(client);
        let ctx = ctx.clone();
        workers.spawn(async move {
            for completed in 0..calls {
                let response = client
                    .greet(&ctx, request.clone())
                    .await
                    .map_err(|source| BenchError::Call {
                        worker,
                        completed,
                        source,
                    })?;
                if response.greeting != expected {
                    return Err(BenchError::Mismatch {
                        worker,
                        expected,
                        actual: response.greeting,
                    });
                }
            }
            Ok(())
        });
    }

    while let Some(joined) = workers.join_next().await {
        let failure = match joined {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => err,
            Err(join_err) => BenchError::Worker(join_err),
        };
        // Stop the remaining workers, in-flight calls included.
        ctx.cancel();
        workers.abort_all();
        return Err(failure);
    }

    Ok(Measured {
        elapsed: start.elapsed(),
        allocations: AllocationSnapshot::now() - before,
    })
}

/// Splits `total` calls into `workers` near-equal private streams.
fn split_calls(total: u64, workers: usize) -> Vec<u64> {
    let workers = workers.max(1) as u64;
    let base = total / workers;
    let remainder = total % workers;
    (0..workers)
        .map(|i| base + u64::from(i < remainder))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_distributes_the_remainder() {
        assert_eq!(split_calls(10, 3), vec![4, 3, 3]);
        assert_eq!(split_calls(2, 4), vec![1, 1, 0, 0]);
        assert_eq!(split_calls(8, 1), vec![8]);
        assert_eq!(split_calls(5, 0), vec![5]);
        assert_eq!(split_calls(1_000, 7).iter().sum::<u64>(), 1_000);
    }

    #[test]
    fn parses_modes() {
        assert_eq!("sequential".parse::<Mode>(), Ok(Mode::Sequential));
        assert_eq!("Parallel".parse::<Mode>(), Ok(Mode::Concurrent));
        assert!("random".parse::<Mode>().is_err());
    }

    #[test]
    fn config_defaults() {
        let config = BenchConfig::new(Mode::Sequential, ProtocolVariant::Native, Target::InProcess);
        assert_eq!(config.warmup_calls, DEFAULT_WARMUP_CALLS);
        assert_eq!(config.iterations, DEFAULT_ITERATIONS);
        assert_eq!(config.name, DEFAULT_NAME);
        assert!(config.workers >= 1);
        assert_eq!(config.effective_workers(), 1);
        assert_eq!(config.label(), "Greet/native/sequential/in-process");
    }

    #[test]
    fn idle_workers_are_not_reported() {
        let config = BenchConfig::new(Mode::Concurrent, ProtocolVariant::Json, Target::InProcess)
            .with_workers(8)
            .with_iterations(3);
        assert_eq!(config.effective_workers(), 3);

        let config = config.with_iterations(100);
        assert_eq!(config.effective_workers(), 8);
    }

    #[test]
    fn matrix_covers_every_combination() {
        let template = BenchConfig::new(Mode::Sequential, ProtocolVariant::Native, Target::InProcess)
            .with_iterations(5);
        let target = Target::External("http://127.0.0.1:1".into());
        let configs = matrix(&Mode::ALL, &ProtocolVariant::ALL, &target, &template);

        assert_eq!(configs.len(), 6);
        assert!(configs.iter().all(|c| c.iterations == 5 && c.target == target));
        assert_eq!(configs[0].label(), "Greet/native/sequential/external");
        assert_eq!(configs[5].label(), "Greet/json/concurrent/external");
    }

    #[test]
    fn rejects_empty_runs() {
        let config = BenchConfig::new(Mode::Concurrent, ProtocolVariant::Grpc, Target::InProcess)
            .with_workers(0);
        assert!(matches!(validate(&config), Err(BenchError::Config(_))));

        let config = config.with_workers(2).with_iterations(0);
        assert!(matches!(validate(&config), Err(BenchError::Config(_))));
    }

    #[test]
    fn skipped_outcome_is_rendered_distinctly() {
        let outcome = BenchOutcome::Skipped {
            label: "Greet/grpc/sequential/external".into(),
            reason: Error::unavailable("connection refused"),
        };
        assert!(outcome.is_skipped());
        assert!(outcome.report().is_none());
        assert_eq!(
            outcome.to_string(),
            "--- SKIP: Greet/grpc/sequential/external: server not available: unavailable: connection refused"
        );
    }
}
