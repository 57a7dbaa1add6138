//! Retry diagnostics
//!
//! Every failed attempt and every decision to stop is reported to a
//! [`RetryDiagnostics`] sink. The events are for operators; they never steer
//! the attempt loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Why the executor stopped retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The failure kind is outside the policy's retriable set
    NonRetriable,
    /// The last allowed attempt failed
    AttemptsExhausted,
    /// The next pause would exceed the cumulative delay budget
    DelayBudgetExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NonRetriable => write!(f, "non-retriable failure"),
            StopReason::AttemptsExhausted => write!(f, "attempts exhausted"),
            StopReason::DelayBudgetExhausted => write!(f, "delay budget exhausted"),
        }
    }
}

/// One observable step of a retried call.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryEvent {
    /// A retriable attempt failed
    AttemptFailed {
        operation: &'static str,
        attempt: u32,
        max_attempts: u32,
        elapsed: Duration,
        total_delay: Duration,
        error: String,
    },
    /// The executor is about to pause before the next attempt
    Sleeping {
        operation: &'static str,
        attempt: u32,
        delay: Duration,
    },
    /// An attempt succeeded after earlier failures
    Recovered {
        operation: &'static str,
        attempt: u32,
        elapsed: Duration,
        total_delay: Duration,
    },
    /// The executor returned the failure to the caller
    GaveUp {
        operation: &'static str,
        reason: StopReason,
        attempt: u32,
        max_attempts: u32,
        elapsed: Duration,
        total_delay: Duration,
        error: String,
    },
}

/// Receives retry events.
pub trait RetryDiagnostics {
    fn record(&self, event: &RetryEvent);
}

impl<D: RetryDiagnostics + ?Sized> RetryDiagnostics for &D {
    fn record(&self, event: &RetryEvent) {
        (**self).record(event);
    }
}

impl<D: RetryDiagnostics + ?Sized> RetryDiagnostics for Arc<D> {
    fn record(&self, event: &RetryEvent) {
        (**self).record(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl RetryDiagnostics for NoopDiagnostics {
    fn record(&self, _event: &RetryEvent) {}
}

/// Writes events as `tracing` records.
///
/// Failed attempts are warnings, pauses and recoveries are informational, and
/// giving up is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl RetryDiagnostics for TracingDiagnostics {
    fn record(&self, event: &RetryEvent) {
        match event {
            RetryEvent::AttemptFailed {
                operation,
                attempt,
                max_attempts,
                elapsed,
                total_delay,
                error,
            } => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    "Attempt {}/{} failed in {}: {}. Elapsed {:.1}s, total delay {:.1}s.",
                    attempt,
                    max_attempts,
                    operation,
                    error,
                    elapsed.as_secs_f64(),
                    total_delay.as_secs_f64()
                );
            }
            RetryEvent::Sleeping {
                operation,
                attempt,
                delay,
            } => {
                tracing::info!(
                    operation,
                    attempt,
                    "Sleeping {:.2}s before next retry...",
                    delay.as_secs_f64()
                );
            }
            RetryEvent::Recovered {
                operation,
                attempt,
                elapsed,
                total_delay,
            } => {
                tracing::info!(
                    operation,
                    attempt,
                    "{} succeeded on attempt {} after {:.1}s (total delay {:.1}s)",
                    operation,
                    attempt,
                    elapsed.as_secs_f64(),
                    total_delay.as_secs_f64()
                );
            }
            RetryEvent::GaveUp {
                operation,
                reason,
                attempt,
                max_attempts,
                elapsed,
                total_delay,
                error,
            } => match reason {
                StopReason::AttemptsExhausted => tracing::error!(
                    operation,
                    %reason,
                    "All {} attempts failed for {}: {}",
                    max_attempts,
                    operation,
                    error
                ),
                StopReason::DelayBudgetExhausted => tracing::error!(
                    operation,
                    %reason,
                    attempt,
                    "Max total delay would be exceeded after {:.1}s of delay, aborting retries of {}: {}",
                    total_delay.as_secs_f64(),
                    operation,
                    error
                ),
                StopReason::NonRetriable => tracing::error!(
                    operation,
                    %reason,
                    attempt,
                    "Non-retriable failure in {} on attempt {} after {:.1}s: {}",
                    operation,
                    attempt,
                    elapsed.as_secs_f64(),
                    error
                ),
            },
        }
    }
}
