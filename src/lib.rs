//! # cookie-refresher
//!
//! Keeps an Instagram session logged in and exports its cookies as a Netscape
//! `cookies.txt` file for tools such as yt-dlp.
//!
#![deny(unsafe_code)]

//! ## Features
//!
//! - **Retry executor**: configurable attempts, fixed or doubling delays,
//!   random jitter, a cumulative delay budget and error-kind filtering.
//! - **Browser seam**: the refresh flow drives a [`browser::Browser`]; the
//!   shipped implementation speaks W3C WebDriver to geckodriver.
//! - **Cookie jar**: Netscape format reading, atomic writing and expiry reports.
//! - **Health endpoint**: `GET /status` on an `axum` server.
//!
//! ## Retry Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use cookie_refresher::retry::{RetryExecutor, RetryPolicy};
//!
//! let policy = RetryPolicy::new()
//!     .with_max_attempts(5)
//!     .with_base_delay(Duration::from_secs(2))
//!     .with_backoff(true)
//!     .with_jitter(Duration::from_secs(1));
//!
//! let body = RetryExecutor::new(policy)
//!     .named("fetch")
//!     .execute(|| std::fs::read_to_string("flaky.txt"))?;
//! ```

pub mod browser;
pub mod config;
pub mod cookies;
pub mod defaults;
pub mod error;
pub mod refresher;
pub mod retry;
pub mod server;
pub mod telemetry;

pub use config::{Config, Credentials};
pub use error::{FailureKind, RefreshError, Result};
pub use refresher::{CookieRefresher, RefreshOutcome, RefreshWorker};
pub use retry::{Classify, RetryExecutor, RetryPolicy};
