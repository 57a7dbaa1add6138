//! Retry executor that handles the actual retry logic
//!
//! `execute` runs a fallible operation until it succeeds or the policy says
//! stop. The caller always gets back the operation's own error, never a
//! wrapper.

use std::fmt::Display;
use std::time::{Duration, Instant};

use super::diagnostics::{RetryDiagnostics, RetryEvent, StopReason, TracingDiagnostics};
use super::policy::{Classify, RetryPolicy};
use super::sleep::{Sleeper, ThreadSleeper};

/// Mutable bookkeeping for a single `execute` call.
#[derive(Debug)]
struct AttemptState {
    attempt: u32,
    current_delay: Duration,
    total_delay: Duration,
    started: Instant,
}

impl AttemptState {
    fn new(base_delay: Duration) -> Self {
        Self {
            attempt: 1,
            current_delay: base_delay,
            total_delay: Duration::ZERO,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, slept: Duration, use_backoff: bool) {
        self.total_delay = self.total_delay.saturating_add(slept);
        if use_backoff {
            self.current_delay = self.current_delay.saturating_mul(2);
        }
        self.attempt += 1;
    }
}

/// Runs operations under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryExecutor<K, S = ThreadSleeper, D = TracingDiagnostics> {
    policy: RetryPolicy<K>,
    sleeper: S,
    diagnostics: D,
    operation: &'static str,
}

impl<K> RetryExecutor<K> {
    /// Create a new retry executor that sleeps the current thread and logs through `tracing`
    pub fn new(policy: RetryPolicy<K>) -> Self {
        Self {
            policy,
            sleeper: ThreadSleeper,
            diagnostics: TracingDiagnostics,
            operation: "operation",
        }
    }
}

impl<K, S, D> RetryExecutor<K, S, D> {
    /// Name used for the operation in diagnostics
    pub fn named(mut self, operation: &'static str) -> Self {
        self.operation = operation;
        self
    }

    /// Replace the sleeper
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> RetryExecutor<K, S2, D> {
        RetryExecutor {
            policy: self.policy,
            sleeper,
            diagnostics: self.diagnostics,
            operation: self.operation,
        }
    }

    /// Replace the diagnostics sink
    pub fn with_diagnostics<D2: RetryDiagnostics>(self, diagnostics: D2) -> RetryExecutor<K, S, D2> {
        RetryExecutor {
            policy: self.policy,
            sleeper: self.sleeper,
            diagnostics,
            operation: self.operation,
        }
    }
}

impl<K, S, D> RetryExecutor<K, S, D>
where
    K: Copy + Eq + std::hash::Hash,
    S: Sleeper,
    D: RetryDiagnostics,
{
    /// Execute a function with retry logic
    ///
    /// The operation runs at most `max_attempts` times. A failure whose kind
    /// the policy does not retry, a failure on the last attempt, or a pause
    /// that would overrun `max_total_delay` ends the call with that failure.
    pub fn execute<T, E, F>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Classify<Kind = K> + Display,
    {
        let mut state = AttemptState::new(self.policy.base_delay);

        loop {
            let error = match operation() {
                Ok(value) => {
                    if state.attempt > 1 {
                        self.diagnostics.record(&RetryEvent::Recovered {
                            operation: self.operation,
                            attempt: state.attempt,
                            elapsed: state.started.elapsed(),
                            total_delay: state.total_delay,
                        });
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.policy.is_retriable(&error.kind()) {
                self.give_up(StopReason::NonRetriable, &state, &error);
                return Err(error);
            }

            self.diagnostics.record(&RetryEvent::AttemptFailed {
                operation: self.operation,
                attempt: state.attempt,
                max_attempts: self.policy.max_attempts,
                elapsed: state.started.elapsed(),
                total_delay: state.total_delay,
                error: error.to_string(),
            });

            if state.attempt >= self.policy.max_attempts {
                self.give_up(StopReason::AttemptsExhausted, &state, &error);
                return Err(error);
            }

            // Budget is checked against the un-jittered delay, before sleeping.
            if let Some(budget) = self.policy.max_total_delay {
                if state.total_delay.saturating_add(state.current_delay) > budget {
                    self.give_up(StopReason::DelayBudgetExhausted, &state, &error);
                    return Err(error);
                }
            }

            let pause = state.current_delay.saturating_add(self.policy.sample_jitter());
            self.diagnostics.record(&RetryEvent::Sleeping {
                operation: self.operation,
                attempt: state.attempt,
                delay: pause,
            });
            self.sleeper.sleep(pause);
            state.advance(pause, self.policy.use_backoff);
        }
    }

    fn give_up(&self, reason: StopReason, state: &AttemptState, error: &impl Display) {
        self.diagnostics.record(&RetryEvent::GaveUp {
            operation: self.operation,
            reason,
            attempt: state.attempt,
            max_attempts: self.policy.max_attempts,
            elapsed: state.started.elapsed(),
            total_delay: state.total_delay,
            error: error.to_string(),
        });
    }
}

/// Convenience function to retry an operation under `policy`, sleeping the
/// current thread and logging through `tracing`
pub fn retry<T, E, F>(policy: RetryPolicy<E::Kind>, operation: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Classify + Display,
{
    RetryExecutor::new(policy).execute(operation)
}
