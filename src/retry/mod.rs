//! Blocking retries with kind filtering, backoff, jitter and a delay budget
//! - policy.rs: attempt/delay budget and failure-kind filtering
//! - executor.rs: the blocking attempt loop
//! - diagnostics.rs: retry events and the sinks that record them
//! - sleep.rs: the pause between attempts

pub mod diagnostics;
pub mod executor;
pub mod policy;
pub mod sleep;

pub use diagnostics::{NoopDiagnostics, RetryDiagnostics, RetryEvent, StopReason, TracingDiagnostics};
pub use executor::{RetryExecutor, retry};
pub use policy::{Classify, RetryPolicy};
pub use sleep::{Sleeper, ThreadSleeper};
