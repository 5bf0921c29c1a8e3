//! Runs the full benchmark matrix: every mode and variant against an in-process server,
//! then against the server at `SERVER_URL` (skipped when nothing listens there).
use greet_core::ProtocolVariant;
use greet_core::bench::alloc::CountingAllocator;
use greet_core::bench::{self, BenchConfig, Mode, Target};
use std::process::ExitCode;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

fn main() -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to start the tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let template = BenchConfig::new(Mode::Sequential, ProtocolVariant::Native, Target::InProcess);
    let mut configs = Vec::new();
    for target in [Target::InProcess, Target::external_from_env()] {
        configs.extend(bench::matrix(
            &Mode::ALL,
            &ProtocolVariant::ALL,
            &target,
            &template,
        ));
    }

    let results = runtime.block_on(bench::run_suite(&configs));

    let mut failed = false;
    for (label, result) in results {
        match result {
            Ok(outcome) => println!("{outcome}"),
            Err(err) => {
                failed = true;
                println!("--- FAIL: {label}: {err}");
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
