//! Cookie refresh flow
//!
//! One refresh run starts a browser, restores the saved cookies, and either
//! keeps the restored session or logs in again, then writes the jar back.
//! Every step that talks to the browser runs under its own retry policy and
//! the whole run is retried on transient failures.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use secrecy::ExposeSecret;

use crate::browser::{Browser, BrowserLauncher, ElementRef, Locator, keys};
use crate::config::Credentials;
use crate::cookies;
use crate::defaults::{instagram, refresh, timings};
use crate::error::{FailureKind, RefreshError, Result};
use crate::retry::{RetryExecutor, RetryPolicy, Sleeper, ThreadSleeper};

/// Consent banner buttons, tried in order
const CONSENT_BUTTONS: [Locator; 5] = [
    Locator::xpath("//button[contains(., 'Allow essential')]"),
    Locator::xpath("//button[contains(., 'Allow all')]"),
    Locator::xpath("//button[contains(., 'Accept')]"),
    Locator::css("button[title='Only allow essential cookies']"),
    Locator::css("button[aria-label='Only allow essential cookies']"),
];

const USERNAME_FIELDS: [Locator; 3] = [
    Locator::css("input[name='username']"),
    Locator::css("input[aria-label='Phone number, username, or email']"),
    Locator::xpath("//input[contains(@aria-label, 'username') or contains(@name, 'username')]"),
];

const PASSWORD_FIELDS: [Locator; 3] = [
    Locator::css("input[name='password']"),
    Locator::css("input[aria-label='Password']"),
    Locator::css("input[type='password']"),
];

/// "Save login info" / notifications prompt shown after submitting
const NOT_NOW_BUTTON: Locator = Locator::xpath("//button[contains(text(), 'Not Now')]");

/// How a refresh run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The saved cookies were still logged in
    ReusedSession { cookies: usize },
    /// A fresh login was needed
    LoggedIn { cookies: usize },
}

impl RefreshOutcome {
    /// Number of cookies written to the jar
    pub fn cookies(&self) -> usize {
        match self {
            RefreshOutcome::ReusedSession { cookies } | RefreshOutcome::LoggedIn { cookies } => *cookies,
        }
    }
}

/// Keeps a Netscape cookie file logged in
#[derive(Debug)]
pub struct CookieRefresher<L, S = ThreadSleeper> {
    launcher: L,
    credentials: Credentials,
    cookies_file: PathBuf,
    sleeper: S,
}

impl<L: BrowserLauncher> CookieRefresher<L> {
    pub fn new(launcher: L, credentials: Credentials, cookies_file: impl Into<PathBuf>) -> Self {
        Self {
            launcher,
            credentials,
            cookies_file: cookies_file.into(),
            sleeper: ThreadSleeper,
        }
    }
}

impl<L, S> CookieRefresher<L, S> {
    /// Replace the sleeper used for page waits and retry pauses
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> CookieRefresher<L, S2> {
        CookieRefresher {
            launcher: self.launcher,
            credentials: self.credentials,
            cookies_file: self.cookies_file,
            sleeper,
        }
    }

    pub fn cookies_file(&self) -> &Path {
        &self.cookies_file
    }
}

impl<L, S> CookieRefresher<L, S>
where
    L: BrowserLauncher,
    S: Sleeper,
{
    /// Run one refresh, retrying the whole run on transient failures
    pub fn refresh_once(&self) -> Result<RefreshOutcome> {
        tracing::info!("Starting cookie refresh with retry mechanism...");
        let policy = RetryPolicy::new()
            .with_max_attempts(refresh::RUN_ATTEMPTS)
            .with_base_delay(refresh::RUN_DELAY)
            .retry_on(FailureKind::TRANSIENT);
        let outcome = self.executor("refresh", policy).execute(|| self.run())?;
        tracing::info!("Cookie refresh completed.");
        Ok(outcome)
    }

    fn executor(&self, operation: &'static str, policy: RetryPolicy<FailureKind>) -> RetryExecutor<FailureKind, &S> {
        RetryExecutor::new(policy).named(operation).with_sleeper(&self.sleeper)
    }

    fn step(&self, operation: &'static str, attempts: u32, delay: Duration) -> RetryExecutor<FailureKind, &S> {
        let policy = RetryPolicy::new()
            .with_max_attempts(attempts)
            .with_base_delay(delay)
            .retry_on(FailureKind::TRANSIENT);
        self.executor(operation, policy)
    }

    fn run(&self) -> Result<RefreshOutcome> {
        tracing::info!("Starting headless Firefox...");
        let mut browser = self
            .step("launch browser", refresh::LAUNCH_ATTEMPTS, refresh::LAUNCH_DELAY)
            .execute(|| self.launcher.launch())?;

        let outcome = self.drive(&mut browser);

        if let Err(e) = browser.quit() {
            tracing::warn!("Failed to close browser: {}", e);
        }
        outcome
    }

    fn drive(&self, browser: &mut L::Session) -> Result<RefreshOutcome> {
        browser.goto(instagram::HOME_URL)?;
        self.sleeper.sleep(timings::PAGE_LOAD);

        if self.restore_cookies(browser) {
            browser.refresh()?;
            self.sleeper.sleep(timings::COOKIE_RELOAD);

            if self.is_logged_in(browser) {
                tracing::info!("Logged in using existing cookies.");
                let cookies = self.save(browser)?;
                return Ok(RefreshOutcome::ReusedSession { cookies });
            }
            tracing::info!("Existing cookies invalid, logging in manually...");
        }

        self.step("login", refresh::LOGIN_ATTEMPTS, refresh::LOGIN_DELAY)
            .execute(|| self.login(browser))?;
        let cookies = self.save(browser)?;
        Ok(RefreshOutcome::LoggedIn { cookies })
    }

    /// Load the saved jar into the browser; false when there is nothing usable
    fn restore_cookies(&self, browser: &mut L::Session) -> bool {
        if !self.cookies_file.exists() {
            return false;
        }

        tracing::info!("Loading existing cookies from {}", self.cookies_file.display());
        let saved = match cookies::load(&self.cookies_file) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!("Ignoring unreadable cookie file: {}", e);
                return false;
            }
        };

        for cookie in &saved {
            if let Err(e) = browser.add_cookie(cookie) {
                tracing::warn!("Could not restore cookie {}: {}", cookie.name, e);
            }
        }
        true
    }

    /// Whether the session is logged in; lookup errors count as logged out
    fn is_logged_in(&self, browser: &mut L::Session) -> bool {
        self.step("login check", refresh::LOGIN_CHECK_ATTEMPTS, refresh::LOGIN_CHECK_DELAY)
            .execute(|| self.check_login(browser))
            .unwrap_or_else(|e| {
                tracing::error!("Error while checking login status: {}", e);
                false
            })
    }

    fn check_login(&self, browser: &mut L::Session) -> Result<bool> {
        browser.goto(instagram::HOME_URL)?;
        self.sleeper.sleep(timings::PAGE_LOAD);
        let url = browser.current_url()?;
        Ok(!url.contains(instagram::LOGIN_PATH_MARKER))
    }

    fn login(&self, browser: &mut L::Session) -> Result<()> {
        browser.goto(instagram::LOGIN_URL)?;
        self.sleeper.sleep(timings::LOGIN_PAGE);
        self.dismiss_consent(browser);

        let username = self.find_first(browser, &USERNAME_FIELDS)?;
        let password = self.find_first(browser, &PASSWORD_FIELDS)?;

        browser.send_keys(&username, &self.credentials.username)?;
        browser.send_keys(&password, self.credentials.password.expose_secret())?;
        browser.send_keys(&password, keys::RETURN)?;
        self.sleeper.sleep(timings::AFTER_SUBMIT);

        match browser.find_element(&NOT_NOW_BUTTON) {
            Ok(button) => {
                browser.click(&button)?;
                self.sleeper.sleep(timings::DIALOG_DISMISS);
            }
            Err(RefreshError::ElementNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        if self.is_logged_in(browser) {
            Ok(())
        } else {
            Err(RefreshError::LoginFailed(format!(
                "still logged out after submitting credentials for {}",
                self.credentials.username
            )))
        }
    }

    fn dismiss_consent(&self, browser: &mut L::Session) {
        for locator in &CONSENT_BUTTONS {
            let Ok(button) = browser.find_element(locator) else {
                continue;
            };
            match browser.click(&button) {
                Ok(()) => {
                    self.sleeper.sleep(timings::CONSENT_DISMISS);
                    return;
                }
                Err(e) => tracing::debug!("Unable to click consent button {}: {}", locator.value, e),
            }
        }
    }

    /// First element matching any locator, polling until the wait runs out
    fn find_first(&self, browser: &mut L::Session, locators: &[Locator]) -> Result<ElementRef> {
        let rounds = (timings::ELEMENT_WAIT.as_millis() / timings::ELEMENT_POLL.as_millis()).max(1);

        for _ in 0..rounds {
            for locator in locators {
                match browser.find_element(locator) {
                    Ok(element) => return Ok(element),
                    Err(RefreshError::ElementNotFound(_)) => continue,
                    Err(e) => return Err(e),
                }
            }
            self.sleeper.sleep(timings::ELEMENT_POLL);
        }

        let tried: Vec<&str> = locators.iter().map(|l| l.value).collect();
        tracing::error!("Login page structure changed, fields not found after waiting: {:?}", tried);
        Err(RefreshError::ElementNotFound(tried.join(" | ")))
    }

    fn save(&self, browser: &mut L::Session) -> Result<usize> {
        tracing::info!("Saving cookies to file {}", self.cookies_file.display());
        let jar = browser.cookies()?;
        let now = Utc::now();
        cookies::save(&self.cookies_file, &jar, now)?;

        for entry in cookies::expiry_report(&jar, now) {
            tracing::info!(
                "Cookie {} expires at {} (Time left: {}){}",
                entry.name,
                entry.expires_at_local(),
                cookies::format_remaining(entry.remaining),
                entry.status.warning()
            );
        }
        Ok(jar.len())
    }
}

/// Background thread running a refresh every `interval`
///
/// A failed refresh is logged and the worker keeps going. `shutdown` waits
/// for a refresh that is already in progress.
#[derive(Debug)]
pub struct RefreshWorker {
    stop: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshWorker {
    pub fn spawn<L, S>(refresher: CookieRefresher<L, S>, interval: Duration) -> io::Result<Self>
    where
        L: BrowserLauncher + Send + 'static,
        S: Sleeper + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("cookie-refresher".to_string())
            .spawn(move || {
                loop {
                    tracing::info!("Refreshing Instagram cookies...");
                    match refresher.refresh_once() {
                        Ok(outcome) => {
                            tracing::info!(cookies = outcome.cookies(), "Cookies refreshed successfully.")
                        }
                        Err(e) => tracing::error!("Cookie refresh failed: {}", e),
                    }

                    tracing::info!("Sleeping for {} seconds...", interval.as_secs());
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::info!("Refresh worker stopped.");
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the worker and wait for it to exit
    pub fn shutdown(mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Refresh worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_cookie_count() {
        assert_eq!(RefreshOutcome::ReusedSession { cookies: 4 }.cookies(), 4);
        assert_eq!(RefreshOutcome::LoggedIn { cookies: 7 }.cookies(), 7);
    }

    #[test]
    fn test_locator_lists_are_distinct() {
        for list in [&USERNAME_FIELDS[..], &PASSWORD_FIELDS[..], &CONSENT_BUTTONS[..]] {
            for (i, a) in list.iter().enumerate() {
                assert!(list[i + 1..].iter().all(|b| b != a), "duplicate locator {}", a.value);
            }
        }
    }
}
