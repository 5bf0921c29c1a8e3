//! Benchmark results and their `go test -bench` style rendering.
use super::{Mode, Target};
use crate::protocol::ProtocolVariant;
use std::fmt;
use std::time::Duration;

/// Measurements of one completed benchmark scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchReport {
    pub mode: Mode,
    pub variant: ProtocolVariant,
    pub target: Target,
    /// Calls executed during the timed phase.
    pub calls: u64,
    pub workers: usize,
    /// Wall-clock time of the timed phase.
    pub elapsed: Duration,
    /// Allocations during the timed phase, `None` without the counting allocator.
    pub allocations: Option<u64>,
    pub allocated_bytes: Option<u64>,
}

impl BenchReport {
    pub fn label(&self) -> String {
        label(self.variant, self.mode, &self.target)
    }

    pub fn nanos_per_call(&self) -> f64 {
        per_call(self.elapsed.as_nanos() as f64, self.calls)
    }

    pub fn calls_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.calls as f64 / secs
    }

    pub fn allocations_per_call(&self) -> Option<f64> {
        self.allocations.map(|n| per_call(n as f64, self.calls))
    }

    pub fn bytes_per_call(&self) -> Option<f64> {
        self.allocated_bytes.map(|n| per_call(n as f64, self.calls))
    }
}

fn per_call(total: f64, calls: u64) -> f64 {
    if calls == 0 {
        return 0.0;
    }
    total / calls as f64
}

/// `Greet/<variant>/<mode>/<target>`.
pub fn label(variant: ProtocolVariant, mode: Mode, target: &Target) -> String {
    format!("Greet/{variant}/{mode}/{}", target.kind())
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<40} {:>10} {:>12.0} ns/op",
            self.label(),
            self.calls,
            self.nanos_per_call()
        )?;
        match (self.bytes_per_call(), self.allocations_per_call()) {
            (Some(bytes), Some(allocs)) => {
                write!(f, " {bytes:>10.0} B/op {allocs:>8.0} allocs/op")?
            }
            _ => write!(f, " {:>10} B/op {:>8} allocs/op", "-", "-")?,
        }
        write!(
            f,
            " {:>10.0} calls/s  workers={}",
            self.calls_per_second(),
            self.workers
        )
    }
}
