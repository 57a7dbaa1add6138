//! Default values
//!
//! Retry budgets, page timings, endpoints and service settings used when the
//! environment does not override them.

use std::time::Duration;

/// Retry executor defaults
pub mod retry {
    use super::*;

    /// Default maximum number of attempts, including the first one
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Default pause between attempts
    pub const BASE_DELAY: Duration = Duration::from_secs(5);

    /// Default upper bound of the random delay added to each pause
    pub const JITTER: Duration = Duration::from_millis(500);
}

/// Per-step retry budgets used by the refresh flow
pub mod refresh {
    use super::*;

    /// Whole refresh run (launch, login, save)
    pub const RUN_ATTEMPTS: u32 = retry::MAX_ATTEMPTS;
    pub const RUN_DELAY: Duration = retry::BASE_DELAY;

    /// Starting a browser session
    pub const LAUNCH_ATTEMPTS: u32 = 3;
    pub const LAUNCH_DELAY: Duration = Duration::from_secs(3);

    /// Checking whether the session is logged in
    pub const LOGIN_CHECK_ATTEMPTS: u32 = 2;
    pub const LOGIN_CHECK_DELAY: Duration = Duration::from_secs(2);

    /// Submitting the login form
    pub const LOGIN_ATTEMPTS: u32 = 3;
    pub const LOGIN_DELAY: Duration = Duration::from_secs(5);
}

/// Page settle times used while driving the browser
pub mod timings {
    use super::*;

    /// Wait after opening the home page
    pub const PAGE_LOAD: Duration = Duration::from_secs(3);

    /// Wait after reloading with restored cookies
    pub const COOKIE_RELOAD: Duration = Duration::from_secs(5);

    /// Wait after opening the login page
    pub const LOGIN_PAGE: Duration = Duration::from_secs(5);

    /// Wait after submitting credentials
    pub const AFTER_SUBMIT: Duration = Duration::from_secs(8);

    /// Wait after dismissing a dialog or consent banner
    pub const DIALOG_DISMISS: Duration = Duration::from_secs(2);
    pub const CONSENT_DISMISS: Duration = Duration::from_secs(1);

    /// How long to look for a form field before giving up
    pub const ELEMENT_WAIT: Duration = Duration::from_secs(15);

    /// Pause between element lookups
    pub const ELEMENT_POLL: Duration = Duration::from_millis(500);
}

/// Instagram endpoints
pub mod instagram {
    pub const HOME_URL: &str = "https://www.instagram.com/";
    pub const LOGIN_URL: &str = "https://www.instagram.com/accounts/login/";

    /// A session still showing this path segment is not logged in
    pub const LOGIN_PATH_MARKER: &str = "accounts/login";
}

/// Service-level defaults
pub mod service {
    use super::*;

    /// Default cookie file path
    pub const COOKIES_FILE: &str = "instagram_cookies.txt";

    /// Default interval between refresh runs
    pub const REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

    /// Default health server address
    pub const BIND_ADDR: &str = "0.0.0.0:5000";

    /// Default geckodriver endpoint
    pub const WEBDRIVER_URL: &str = "http://localhost:4444";

    /// Timeout for a single WebDriver command
    ///
    /// Page navigation blocks until the document is loaded, so this is kept generous.
    pub const WEBDRIVER_TIMEOUT: Duration = Duration::from_secs(120);

    /// Lifetime assumed for cookies saved without an expiry
    pub const COOKIE_FALLBACK_TTL: Duration = Duration::from_secs(3600);
}

/// Logging and tracing defaults
pub mod logging {
    /// Default log level
    pub const LOG_LEVEL: &str = "info";
}
