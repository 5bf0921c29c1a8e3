//! # Greet CLI Entry Point
//!
//! The main executable of the Greet harness:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs
//!    the `tracing` subscriber, filtered by `LOG_LEVEL`.
//! 2. **Execution**: Performs a single call, serves the greet route, or runs the
//!    benchmark matrix through `greet_core`.
//! 3. **Presentation**: Formats results to standard output and failures to standard
//!    error, exiting with a non-zero status on failure.

mod cli;
mod formatter;

use anyhow::Context;
use clap::Parser;
use cli::{BenchArgs, Cli, Commands, TargetKind};
use formatter::{BenchLine, FormattedString, GenericError};
use greet_core::bench::alloc::CountingAllocator;
use greet_core::bench::{self, BenchConfig, Mode, Target};
use greet_core::{CallContext, GreetClient, GreetRequest, Greeter, ProtocolVariant, ServerHandle};
use std::net::SocketAddr;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// Benchmarks report allocations per call only when this allocator is installed.
#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_tracing();

    match args.command {
        Commands::Call {
            url,
            protocol,
            timeout_ms,
            name,
        } => run_call(&url, protocol, timeout_ms, name).await,
        Commands::Serve { listen } => {
            if let Err(err) = serve(listen).await {
                let message = GenericError("Server Failed", format!("{err:#}"));
                eprintln!("{}", FormattedString::from(message));
                process::exit(1);
            }
        }
        Commands::Bench(args) => run_bench(args).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn run_call(url: &str, protocol: ProtocolVariant, timeout_ms: Option<u64>, name: String) {
    let client = match GreetClient::new(url, protocol) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{}", FormattedString::from(GenericError("Invalid server URL", err)));
            process::exit(1);
        }
    };

    let ctx = match timeout_ms {
        Some(ms) => CallContext::with_timeout(Duration::from_millis(ms)),
        None => CallContext::background(),
    };

    match client.greet(&ctx, GreetRequest::new(name)).await {
        Ok(response) => println!("{}", FormattedString::from(response)),
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

async fn serve(listen: SocketAddr) -> anyhow::Result<()> {
    let server = ServerHandle::bind(Greeter, listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for the interrupt signal")?;

    tracing::info!("Interrupted, shutting down");
    server.shutdown().await.context("Failed to shut down cleanly")
}

async fn run_bench(args: BenchArgs) {
    let target = match args.target {
        TargetKind::InProcess => Target::InProcess,
        TargetKind::External => Target::External(args.url),
    };

    let mut template = BenchConfig::new(Mode::Sequential, ProtocolVariant::Native, target.clone())
        .with_iterations(args.iterations)
        .with_warmup_calls(args.warmup)
        .with_name(args.name);
    if let Some(workers) = args.workers {
        template = template.with_workers(workers);
    }

    let modes = if args.modes.is_empty() {
        Mode::ALL.to_vec()
    } else {
        args.modes
    };
    let variants = if args.protocols.is_empty() {
        ProtocolVariant::ALL.to_vec()
    } else {
        args.protocols
    };

    let configs = bench::matrix(&modes, &variants, &target, &template);
    let results = bench::run_suite(&configs).await;

    let mut failed = false;
    for (label, result) in &results {
        failed |= result.is_err();
        println!("{}", BenchLine(label, result));
    }

    if failed {
        process::exit(1);
    }
}
