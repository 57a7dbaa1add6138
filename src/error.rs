//! Error types for the cookie refresher
//!
//! `RefreshError` covers every failure of the service. Each variant maps onto a
//! [`FailureKind`], which is what retry policies filter on.

use std::path::PathBuf;

use thiserror::Error;

use crate::retry::Classify;

/// Errors that can occur while refreshing or serving cookies
#[derive(Error, Debug)]
pub enum RefreshError {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required environment variable is not set
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),

    /// File system failure
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed line in a Netscape cookie file
    #[error("Invalid cookie line {line}: {reason}")]
    CookieFormat { line: usize, reason: String },

    /// The WebDriver endpoint could not be reached or answered garbage
    #[error("WebDriver transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The WebDriver endpoint answered with an error payload
    #[error("WebDriver error `{error}`: {message}")]
    WebDriver { error: String, message: String },

    /// No element matched a locator
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Credentials were submitted but the session is still logged out
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// Logging could not be initialized
    #[error("Telemetry initialization error: {0}")]
    Telemetry(String),

    /// Health server failure
    #[error("Health server error: {0}")]
    Server(String),
}

/// Failure categories used for retry filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Config,
    Io,
    CookieFormat,
    Transport,
    WebDriver,
    ElementNotFound,
    Login,
    Telemetry,
    Server,
}

impl FailureKind {
    /// Kinds caused by the network, the browser or the target site, which
    /// may clear up on their own
    pub const TRANSIENT: [FailureKind; 5] = [
        FailureKind::Io,
        FailureKind::Transport,
        FailureKind::WebDriver,
        FailureKind::ElementNotFound,
        FailureKind::Login,
    ];
}

impl RefreshError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the error is worth retrying
    pub fn is_retryable(&self) -> bool {
        FailureKind::TRANSIENT.contains(&self.kind())
    }
}

impl Classify for RefreshError {
    type Kind = FailureKind;

    fn kind(&self) -> FailureKind {
        match self {
            RefreshError::Config(_) | RefreshError::MissingVar(_) => FailureKind::Config,
            RefreshError::Io { .. } => FailureKind::Io,
            RefreshError::CookieFormat { .. } => FailureKind::CookieFormat,
            RefreshError::Transport(_) => FailureKind::Transport,
            RefreshError::WebDriver { .. } => FailureKind::WebDriver,
            RefreshError::ElementNotFound(_) => FailureKind::ElementNotFound,
            RefreshError::LoginFailed(_) => FailureKind::Login,
            RefreshError::Telemetry(_) => FailureKind::Telemetry,
            RefreshError::Server(_) => FailureKind::Server,
        }
    }
}

/// Result type for refresher operations
pub type Result<T> = std::result::Result<T, RefreshError>;
