//! Logging setup
//!
//! Initializes a `tracing-subscriber` fmt subscriber. Records at WARN and
//! ERROR go to stderr, everything else goes to stdout, in either plain text
//! or one JSON object per line.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cookie_refresher::telemetry::{init_subscriber, OutputFormat, LogConfig};
//!
//! let config = LogConfig::builder()
//!     .log_level("debug")
//!     .output_format(OutputFormat::Json)
//!     .build();
//! init_subscriber(&config)?;
//! ```

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::defaults;
use crate::error::{RefreshError, Result};

/// Output format for log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `target: message` lines
    #[default]
    Plain,
    /// One JSON object per line
    Json,
}

impl FromStr for OutputFormat {
    type Err = RefreshError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "plain" | "text" => Ok(OutputFormat::Plain),
            "json" => Ok(OutputFormat::Json),
            other => Err(RefreshError::Config(format!(
                "Invalid log format: {other}. Valid options: plain, json"
            ))),
        }
    }
}

/// Configuration for the tracing subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level name or `EnvFilter` directives
    pub log_level: String,
    /// Output format
    pub output_format: OutputFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::logging::LOG_LEVEL.to_string(),
            output_format: OutputFormat::Plain,
        }
    }
}

impl LogConfig {
    /// Start from the defaults
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }

    /// Build the filter; level names are accepted in any case
    pub fn env_filter(&self) -> Result<EnvFilter> {
        let directives = self.log_level.trim().to_lowercase();
        EnvFilter::try_new(&directives).map_err(|e| {
            RefreshError::Telemetry(format!("Invalid log level {}: {e}", self.log_level))
        })
    }
}

/// Incremental construction of [`LogConfig`]
#[derive(Debug, Default)]
pub struct LogConfigBuilder {
    log_level: Option<String>,
    output_format: Option<OutputFormat>,
}

impl LogConfigBuilder {
    /// Set the log level or filter directives
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Plain or JSON
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Finish, filling unset fields with defaults
    pub fn build(self) -> LogConfig {
        LogConfig {
            log_level: self
                .log_level
                .unwrap_or_else(|| defaults::logging::LOG_LEVEL.to_string()),
            output_format: self.output_format.unwrap_or_default(),
        }
    }
}

/// Initialize the global tracing subscriber
///
/// Calling this again after a subscriber is installed is not an error.
pub fn init_subscriber(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter()?;
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    let init_result = match config.output_format {
        OutputFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .json()
            .try_init(),
        OutputFormat::Plain => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(true)
            .try_init(),
    };

    // Another subscriber won the race since the check above
    match init_result {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_msg = e.to_string();
            if error_msg.contains("global default trace dispatcher has already been set") {
                Ok(())
            } else {
                Err(RefreshError::Telemetry(format!(
                    "Failed to initialize tracing: {e}"
                )))
            }
        }
    }
}
