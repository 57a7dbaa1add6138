//! Retry policy configuration
//!
//! A policy bounds one `execute` call: how many times the operation may run,
//! how long to pause between runs, and which failure kinds are worth another try.

use std::collections::HashSet;
use std::hash::Hash;
use std::io;
use std::time::Duration;

use rand::Rng;

use crate::defaults;

/// Maps a failure onto a closed set of kinds used for retry filtering.
pub trait Classify {
    /// The failure kind; usually a fieldless enum.
    type Kind: Copy + Eq + Hash;

    /// Kind of this failure
    fn kind(&self) -> Self::Kind;
}

impl Classify for io::Error {
    type Kind = io::ErrorKind;

    fn kind(&self) -> io::ErrorKind {
        io::Error::kind(self)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy<K> {
    /// Maximum number of attempts, including the first one (never below 1)
    pub max_attempts: u32,
    /// Pause before the second attempt
    pub base_delay: Duration,
    /// Kinds worth retrying; empty means every kind is retried
    pub retriable_kinds: HashSet<K>,
    /// Double the pause after each failed attempt
    pub use_backoff: bool,
    /// Upper bound on the summed pauses of one call
    pub max_total_delay: Option<Duration>,
    /// Upper bound of the random delay added to each pause
    pub jitter_max: Duration,
}

impl<K> Default for RetryPolicy<K> {
    fn default() -> Self {
        Self {
            max_attempts: defaults::retry::MAX_ATTEMPTS,
            base_delay: defaults::retry::BASE_DELAY,
            retriable_kinds: HashSet::new(),
            use_backoff: false,
            max_total_delay: None,
            jitter_max: defaults::retry::JITTER,
        }
    }
}

impl<K> RetryPolicy<K> {
    /// Create a new retry policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts; zero is treated as one
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        self
    }

    /// Set the initial pause
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Enable or disable doubling of the pause
    pub const fn with_backoff(mut self, use_backoff: bool) -> Self {
        self.use_backoff = use_backoff;
        self
    }

    /// Cap the summed pauses of one call
    pub const fn with_max_total_delay(mut self, budget: Duration) -> Self {
        self.max_total_delay = Some(budget);
        self
    }

    /// Set the jitter bound; zero disables jitter
    pub const fn with_jitter(mut self, jitter_max: Duration) -> Self {
        self.jitter_max = jitter_max;
        self
    }

    /// Random share added on top of a pause
    pub(crate) fn sample_jitter(&self) -> Duration {
        if self.jitter_max.is_zero() {
            return Duration::ZERO;
        }
        rand::thread_rng().gen_range(Duration::ZERO..=self.jitter_max)
    }
}

impl<K: Eq + Hash> RetryPolicy<K> {
    /// Retry only failures of these kinds
    pub fn retry_on(mut self, kinds: impl IntoIterator<Item = K>) -> Self {
        self.retriable_kinds.extend(kinds);
        self
    }

    /// Check if a failure kind should be retried
    pub fn is_retriable(&self, kind: &K) -> bool {
        self.retriable_kinds.is_empty() || self.retriable_kinds.contains(kind)
    }
}
