//! Browser automation seam
//!
//! The refresh flow only talks to [`Browser`] and [`BrowserLauncher`]; the
//! WebDriver implementation lives in [`webdriver`].

pub mod webdriver;

use crate::cookies::Cookie;
use crate::error::Result;

pub use webdriver::{FirefoxOptions, WebDriverLauncher, WebDriverSession};

/// Special keys understood by `send_keys`
pub mod keys {
    /// Enter / Return
    pub const RETURN: &str = "\u{E006}";
}

/// How to find an element on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    /// WebDriver location strategy (`css selector` or `xpath`)
    pub using: &'static str,
    pub value: &'static str,
}

impl Locator {
    pub const fn css(value: &'static str) -> Self {
        Self {
            using: "css selector",
            value,
        }
    }

    pub const fn xpath(value: &'static str) -> Self {
        Self {
            using: "xpath",
            value,
        }
    }
}

/// Opaque handle to an element of the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

/// A live browser session.
///
/// `find_element` fails with `RefreshError::ElementNotFound` when nothing
/// matches.
pub trait Browser {
    fn goto(&mut self, url: &str) -> Result<()>;
    fn current_url(&mut self) -> Result<String>;
    fn refresh(&mut self) -> Result<()>;
    fn add_cookie(&mut self, cookie: &Cookie) -> Result<()>;
    fn cookies(&mut self) -> Result<Vec<Cookie>>;
    fn find_element(&mut self, locator: &Locator) -> Result<ElementRef>;
    fn click(&mut self, element: &ElementRef) -> Result<()>;
    fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<()>;
    /// Close the session; further calls are undefined
    fn quit(&mut self) -> Result<()>;
}

/// Starts browser sessions.
pub trait BrowserLauncher {
    type Session: Browser;

    fn launch(&self) -> Result<Self::Session>;
}
