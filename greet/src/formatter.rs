use colored::*;
use greet_core::bench::{BenchError, BenchOutcome};
use greet_core::{Error, GreetResponse};
use std::fmt::Display;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct GenericError<T: Display>(pub &'static str, pub T);

/// One scenario of a benchmark run, labelled.
pub struct BenchLine<'a>(pub &'a str, pub &'a Result<BenchOutcome, BenchError>);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<GreetResponse> for FormattedString {
    fn from(response: GreetResponse) -> Self {
        FormattedString(response.greeting.green().to_string())
    }
}

impl From<Error> for FormattedString {
    fn from(err: Error) -> Self {
        FormattedString(format!(
            "{} code={} message={:?}",
            "Call Failed:".red().bold(),
            err.code(),
            err.message()
        ))
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}:\n\n'{}'", msg.red().bold(), err))
    }
}

impl Display for BenchLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let BenchLine(label, result) = self;
        match result {
            Ok(outcome @ BenchOutcome::Completed(_)) => write!(f, "{outcome}"),
            Ok(outcome @ BenchOutcome::Skipped { .. }) => {
                write!(f, "{}", outcome.to_string().yellow())
            }
            Err(err) => write!(f, "{} {label}: {err}", "--- FAIL:".red().bold()),
        }
    }
}
