//! # CLI
//!
//! This module defines the command-line interface of `greet` using `clap`.
//!
//! Every URL and address argument falls back to an environment variable (`SERVER_URL`,
//! `LISTEN_ADDR`) so the same binary can be pointed at a server from scripts.
use clap::{Args, Parser, Subcommand, ValueEnum};
use greet_core::ProtocolVariant;
use greet_core::bench::{DEFAULT_ITERATIONS, DEFAULT_NAME, DEFAULT_WARMUP_CALLS, Mode};
use greet_core::client::DEFAULT_SERVER_URL;
use std::net::SocketAddr;

#[derive(Parser)]
#[command(
    name = "greet",
    version,
    about = "Call, serve and benchmark the Greet RPC"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Perform a single greet call
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// greet call --protocol grpc TestUser
    /// ```
    Call {
        /// Base URL of the server (e.g. http://127.0.0.1:8080)
        #[arg(long, env = "SERVER_URL", default_value = DEFAULT_SERVER_URL)]
        url: String,

        /// Protocol variant: native, grpc or json
        #[arg(short, long, default_value_t = ProtocolVariant::Native)]
        protocol: ProtocolVariant,

        /// Deadline of the call in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Name to greet
        name: String,
    },

    /// Serve the greet route for all protocol variants until interrupted
    Serve {
        /// Address to listen on
        #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
    },

    /// Benchmark the protocol variants
    ///
    /// Runs every combination of the selected modes and protocols and prints one row
    /// per scenario. Scenarios against an external server that is not running are
    /// skipped.
    Bench(BenchArgs),
}

#[derive(Args)]
pub struct BenchArgs {
    /// Server to measure
    #[arg(long, value_enum, default_value_t = TargetKind::InProcess)]
    pub target: TargetKind,

    /// Base URL of the external server
    #[arg(long, env = "SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub url: String,

    /// Protocol variants to measure, all when omitted
    #[arg(short, long = "protocol", value_delimiter = ',')]
    pub protocols: Vec<ProtocolVariant>,

    /// Modes to measure (sequential, concurrent), all when omitted
    #[arg(short, long = "mode", value_delimiter = ',')]
    pub modes: Vec<Mode>,

    /// Timed calls per scenario
    #[arg(short = 'n', long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: u64,

    /// Workers in concurrent mode, defaults to the available parallelism
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Untimed calls issued before measuring
    #[arg(long, default_value_t = DEFAULT_WARMUP_CALLS)]
    pub warmup: usize,

    /// Name sent in every request
    #[arg(long, default_value = DEFAULT_NAME)]
    pub name: String,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetKind {
    /// Start a server inside this process for each scenario
    InProcess,
    /// Use the server at `--url`
    External,
}
