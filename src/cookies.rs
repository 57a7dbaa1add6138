//! Netscape cookie file handling
//!
//! Reads and writes the tab-separated `cookies.txt` format understood by curl
//! and yt-dlp, and summarizes how long each saved cookie stays valid.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Local, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{RefreshError, Result};

const HEADER: &str = "# Netscape HTTP Cookie File\n\
# This file was generated by cookie-refresher.\n\
# http://curl.haxx.se/docs/http-cookies.html\n\n";

/// curl marks HttpOnly cookies by prefixing the domain field
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// A browser cookie, serialized with WebDriver field names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(rename = "httpOnly", default)]
    pub http_only: bool,
    /// Expiry as seconds since the Unix epoch; `None` for session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            secure: false,
            http_only: false,
            expiry: None,
        }
    }

    /// Whether the cookie also applies to subdomains
    pub fn include_subdomains(&self) -> bool {
        self.domain.starts_with('.')
    }
}

/// Parse the contents of a Netscape cookie file
pub fn parse_netscape(contents: &str) -> Result<Vec<Cookie>> {
    let mut cookies = Vec::new();

    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim_end_matches(['\r', '\n']);
        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None => (line, false),
        };
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let invalid = |reason: String| RefreshError::CookieFormat {
            line: index + 1,
            reason,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        let &[domain, _subdomains, path, secure, expiry, name, value] = fields.as_slice() else {
            return Err(invalid(format!(
                "expected 7 tab-separated fields, found {}",
                fields.len()
            )));
        };

        let expiry: i64 = expiry
            .trim()
            .parse()
            .map_err(|e| invalid(format!("bad expiry {expiry:?}: {e}")))?;

        cookies.push(Cookie {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: path.to_string(),
            secure: secure.eq_ignore_ascii_case("TRUE"),
            http_only,
            // curl writes 0 for session cookies
            expiry: (expiry != 0).then_some(expiry),
        });
    }

    Ok(cookies)
}

/// Render cookies as a Netscape cookie file
///
/// Cookies without an expiry are written with a short fallback lifetime so
/// that consumers which ignore session cookies still pick them up.
pub fn write_netscape(cookies: &[Cookie], now: DateTime<Utc>) -> String {
    let fallback_expiry = now.timestamp() + defaults::service::COOKIE_FALLBACK_TTL.as_secs() as i64;
    let mut out = String::from(HEADER);

    for cookie in cookies {
        let prefix = if cookie.http_only { HTTP_ONLY_PREFIX } else { "" };
        let _ = writeln!(
            out,
            "{prefix}{}\t{}\t{}\t{}\t{}\t{}\t{}",
            cookie.domain,
            flag(cookie.include_subdomains()),
            cookie.path,
            flag(cookie.secure),
            cookie.expiry.unwrap_or(fallback_expiry),
            cookie.name,
            cookie.value
        );
    }

    out
}

fn flag(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

/// Read and parse a cookie file
pub fn load(path: &Path) -> Result<Vec<Cookie>> {
    let contents = fs::read_to_string(path).map_err(|e| RefreshError::io(path, e))?;
    parse_netscape(&contents)
}

/// Write a cookie file
///
/// The file is written next to its destination first and then renamed, so
/// readers never observe a half-written jar.
pub fn save(path: &Path, cookies: &[Cookie], now: DateTime<Utc>) -> Result<()> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = Path::new(&staging);

    fs::write(staging, write_netscape(cookies, now)).map_err(|e| RefreshError::io(staging, e))?;
    fs::rename(staging, path).map_err(|e| RefreshError::io(path, e))
}

/// How close a cookie is to expiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    Healthy,
    /// Expires within seven days
    ExpiresThisWeek,
    /// Expires within a day
    ExpiringSoon,
    Expired,
}

impl ExpiryStatus {
    fn from_remaining(remaining: TimeDelta) -> Self {
        if remaining <= TimeDelta::zero() {
            ExpiryStatus::Expired
        } else if remaining <= TimeDelta::days(1) {
            ExpiryStatus::ExpiringSoon
        } else if remaining <= TimeDelta::days(7) {
            ExpiryStatus::ExpiresThisWeek
        } else {
            ExpiryStatus::Healthy
        }
    }

    /// Suffix appended to the expiry log line
    pub fn warning(&self) -> &'static str {
        match self {
            ExpiryStatus::Healthy => "",
            ExpiryStatus::ExpiresThisWeek => " \u{26a0}\u{fe0f} Less than 7 days",
            ExpiryStatus::ExpiringSoon => " \u{2757} Expiring soon!",
            ExpiryStatus::Expired => " \u{2757} Expired!",
        }
    }
}

/// Expiry summary for one cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieExpiry {
    pub name: String,
    pub expires_at: DateTime<Utc>,
    pub remaining: TimeDelta,
    pub status: ExpiryStatus,
}

impl CookieExpiry {
    /// Local wall-clock expiry, `%Y-%m-%d %H:%M:%S`
    pub fn expires_at_local(&self) -> String {
        self.expires_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

/// Summarize the expiry of every cookie that carries one
pub fn expiry_report(cookies: &[Cookie], now: DateTime<Utc>) -> Vec<CookieExpiry> {
    cookies
        .iter()
        .filter_map(|cookie| {
            let expires_at = DateTime::from_timestamp(cookie.expiry?, 0)?;
            let remaining = expires_at - now;
            Some(CookieExpiry {
                name: cookie.name.clone(),
                expires_at,
                remaining,
                status: ExpiryStatus::from_remaining(remaining),
            })
        })
        .collect()
}

/// Compact remaining-time label: `2d 3h 15m`, `3h 15m` or `15m`
pub fn format_remaining(remaining: TimeDelta) -> String {
    if remaining <= TimeDelta::zero() {
        return "expired".to_string();
    }
    let days = remaining.num_days();
    let hours = remaining.num_hours() % 24;
    let minutes = remaining.num_minutes() % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "# Netscape HTTP Cookie File\n\
# http://curl.haxx.se/docs/http-cookies.html\n\
\n\
.instagram.com\tTRUE\t/\tTRUE\t1767225600\tsessionid\tabc%3A123\n\
#HttpOnly_.instagram.com\tTRUE\t/\tTRUE\t1767225600\tds_user_id\t42\n\
www.instagram.com\tFALSE\t/accounts\tFALSE\t0\tig_nrcb\t1\n";

    fn at(timestamp: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(timestamp, 0).unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let cookies = parse_netscape(SAMPLE).unwrap();
        assert_eq!(cookies.len(), 3);

        assert_eq!(cookies[0].name, "sessionid");
        assert_eq!(cookies[0].value, "abc%3A123");
        assert_eq!(cookies[0].domain, ".instagram.com");
        assert!(cookies[0].secure);
        assert!(!cookies[0].http_only);
        assert_eq!(cookies[0].expiry, Some(1767225600));

        assert!(cookies[1].http_only);
        assert_eq!(cookies[1].domain, ".instagram.com");

        assert_eq!(cookies[2].path, "/accounts");
        assert!(!cookies[2].include_subdomains());
        assert_eq!(cookies[2].expiry, None);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse_netscape("# header\n\n.instagram.com\tTRUE\t/\n").unwrap_err();
        match err {
            RefreshError::CookieFormat { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = parse_netscape(".a.com\tTRUE\t/\tFALSE\tsoon\tn\tv\n").unwrap_err();
        assert!(matches!(err, RefreshError::CookieFormat { line: 1, .. }));
    }

    #[test]
    fn test_write_uses_fallback_expiry_and_flags() {
        let mut session = Cookie::new("csrftoken", "xyz", ".instagram.com");
        session.secure = true;
        let mut pinned = Cookie::new("mid", "m1", "www.instagram.com");
        pinned.expiry = Some(2_000_000_000);
        pinned.http_only = true;

        let text = write_netscape(&[session, pinned], at(1_700_000_000));

        assert!(text.starts_with("# Netscape HTTP Cookie File\n"));
        assert!(text.contains(".instagram.com\tTRUE\t/\tTRUE\t1700003600\tcsrftoken\txyz\n"));
        assert!(text.contains("#HttpOnly_www.instagram.com\tFALSE\t/\tFALSE\t2000000000\tmid\tm1\n"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.txt");
        let mut cookie = Cookie::new("sessionid", "s3cr3t", ".instagram.com");
        cookie.expiry = Some(1_900_000_000);

        save(&path, std::slice::from_ref(&cookie), at(1_700_000_000)).unwrap();

        assert_eq!(load(&path).unwrap(), vec![cookie]);
        assert!(!dir.path().join("cookies.txt.tmp").exists());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, RefreshError::Io { .. }));
    }

    #[test]
    fn test_expiry_report() {
        let now = at(1_700_000_000);
        let mut long = Cookie::new("long", "1", ".x.com");
        long.expiry = Some(now.timestamp() + 30 * 86_400);
        let mut week = Cookie::new("week", "1", ".x.com");
        week.expiry = Some(now.timestamp() + 3 * 86_400);
        let mut soon = Cookie::new("soon", "1", ".x.com");
        soon.expiry = Some(now.timestamp() + 3_600);
        let mut gone = Cookie::new("gone", "1", ".x.com");
        gone.expiry = Some(now.timestamp() - 60);
        let session = Cookie::new("session", "1", ".x.com");

        let report = expiry_report(&[long, week, soon, gone, session], now);
        let statuses: Vec<_> = report.iter().map(|e| (e.name.as_str(), e.status)).collect();

        assert_eq!(
            statuses,
            vec![
                ("long", ExpiryStatus::Healthy),
                ("week", ExpiryStatus::ExpiresThisWeek),
                ("soon", ExpiryStatus::ExpiringSoon),
                ("gone", ExpiryStatus::Expired),
            ]
        );
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(
            format_remaining(TimeDelta::days(2) + TimeDelta::hours(3) + TimeDelta::minutes(15)),
            "2d 3h 15m"
        );
        assert_eq!(format_remaining(TimeDelta::hours(5) + TimeDelta::minutes(1)), "5h 1m");
        assert_eq!(format_remaining(TimeDelta::minutes(42)), "42m");
        assert_eq!(format_remaining(TimeDelta::seconds(-5)), "expired");
    }
}
