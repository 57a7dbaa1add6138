//! Service configuration
//!
//! Everything is read from environment variables (a `.env` file is loaded by
//! the binary first). [`Config::from_lookup`] takes any lookup function so
//! tests do not have to touch the process environment.
//!
//! Supported environment variables:
//! - `INSTAGRAM_USERNAME`, `INSTAGRAM_PASSWORD`: login credentials (required)
//! - `COOKIES_FILE`: Netscape cookie file path
//! - `REFRESH_INTERVAL_SECONDS`: pause between refresh runs
//! - `WEBDRIVER_URL`: geckodriver endpoint
//! - `BROWSER_HEADLESS`, `BROWSER_LIGHTWEIGHT`: Firefox switches
//! - `HEALTH_BIND_ADDR`: health server address
//! - `LOG_FORMAT` (plain, json), `LOG_LEVEL`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::browser::webdriver::FirefoxOptions;
use crate::defaults;
use crate::error::{RefreshError, Result};
use crate::telemetry::{OutputFormat, LogConfig};

/// Login credentials for the target site
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Complete service configuration
#[derive(Debug)]
pub struct Config {
    pub credentials: Credentials,
    pub cookies_file: PathBuf,
    pub refresh_interval: Duration,
    pub webdriver_url: String,
    pub browser: FirefoxOptions,
    pub bind_addr: SocketAddr,
    pub log: LogConfig,
}

impl Config {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(RefreshError::MissingVar(key));

        let credentials = Credentials::new(
            require("INSTAGRAM_USERNAME")?,
            require("INSTAGRAM_PASSWORD")?,
        );

        let refresh_interval = match get("REFRESH_INTERVAL_SECONDS") {
            Some(raw) => Duration::from_secs(parse_value("REFRESH_INTERVAL_SECONDS", &raw)?),
            None => defaults::service::REFRESH_INTERVAL,
        };

        let bind_addr = parse_value(
            "HEALTH_BIND_ADDR",
            &get("HEALTH_BIND_ADDR").unwrap_or_else(|| defaults::service::BIND_ADDR.to_string()),
        )?;

        let browser = FirefoxOptions {
            headless: parse_flag("BROWSER_HEADLESS", get("BROWSER_HEADLESS"), true)?,
            lightweight: parse_flag("BROWSER_LIGHTWEIGHT", get("BROWSER_LIGHTWEIGHT"), true)?,
        };

        let mut log = LogConfig::builder();
        if let Some(level) = get("LOG_LEVEL") {
            log = log.log_level(level);
        }
        if let Some(format) = get("LOG_FORMAT") {
            log = log.output_format(format.parse::<OutputFormat>()?);
        }

        Ok(Self {
            credentials,
            cookies_file: get("COOKIES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(defaults::service::COOKIES_FILE)),
            refresh_interval,
            webdriver_url: get("WEBDRIVER_URL")
                .unwrap_or_else(|| defaults::service::WEBDRIVER_URL.to_string()),
            browser,
            bind_addr,
            log: log.build(),
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| RefreshError::Config(format!("{key}={raw}: {e}")))
}

fn parse_flag(key: &str, raw: Option<String>, default: bool) -> Result<bool> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RefreshError::Config(format!("{key}={raw}: expected a boolean"))),
    }
}
