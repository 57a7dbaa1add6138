//! W3C WebDriver client
//!
//! Speaks the WebDriver wire protocol (JSON over HTTP) to geckodriver using a
//! blocking `reqwest` client. Every response is wrapped in `{"value": ...}`;
//! failures carry `{"error": ..., "message": ...}` inside that envelope.

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::{Browser, BrowserLauncher, ElementRef, Locator};
use crate::cookies::Cookie;
use crate::defaults;
use crate::error::{RefreshError, Result};

/// Firefox session switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirefoxOptions {
    /// Run without a visible window
    pub headless: bool,
    /// Skip images, stylesheets, subdocuments and plugins
    pub lightweight: bool,
}

impl Default for FirefoxOptions {
    fn default() -> Self {
        Self {
            headless: true,
            lightweight: true,
        }
    }
}

impl FirefoxOptions {
    /// New-session request body
    pub fn capabilities(&self) -> Value {
        let args: Vec<&str> = if self.headless { vec!["-headless"] } else { Vec::new() };
        let prefs = if self.lightweight {
            json!({
                "permissions.default.image": 2,
                "dom.ipc.plugins.enabled.libflashplayer.so": "false",
                "permissions.default.stylesheet": 2,
                "permissions.default.subdocument": 2,
                "permissions.default.object": 2,
            })
        } else {
            json!({})
        };

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": {
                        "args": args,
                        "prefs": prefs,
                    }
                }
            }
        })
    }
}

#[derive(Deserialize)]
struct Envelope {
    value: Value,
}

#[derive(Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Deserialize)]
struct WireElement {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    id: String,
}

fn send(request: RequestBuilder) -> Result<Value> {
    let response = request.send()?;
    let status = response.status();
    let envelope: Envelope = response.json()?;

    if status.is_success() {
        return Ok(envelope.value);
    }

    match serde_json::from_value::<WireError>(envelope.value) {
        Ok(wire) if wire.error == "no such element" => Err(RefreshError::ElementNotFound(wire.message)),
        Ok(wire) => Err(RefreshError::WebDriver {
            error: wire.error,
            message: wire.message,
        }),
        Err(_) => Err(RefreshError::WebDriver {
            error: status.to_string(),
            message: "unrecognized error payload".to_string(),
        }),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| RefreshError::WebDriver {
        error: "invalid response".to_string(),
        message: e.to_string(),
    })
}

/// Starts Firefox sessions on a WebDriver endpoint
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    client: Client,
    endpoint: String,
    options: FirefoxOptions,
}

impl WebDriverLauncher {
    /// Create a launcher for `endpoint`, e.g. `http://localhost:4444`
    pub fn new(endpoint: impl Into<String>, options: FirefoxOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(defaults::service::WEBDRIVER_TIMEOUT)
            .build()?;
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            endpoint,
            options,
        })
    }
}

impl BrowserLauncher for WebDriverLauncher {
    type Session = WebDriverSession;

    fn launch(&self) -> Result<WebDriverSession> {
        tracing::debug!(endpoint = %self.endpoint, headless = self.options.headless, "Starting Firefox session");
        let value = send(
            self.client
                .post(format!("{}/session", self.endpoint))
                .json(&self.options.capabilities()),
        )?;
        let session: NewSession = decode(value)?;

        Ok(WebDriverSession {
            client: self.client.clone(),
            base: format!("{}/session/{}", self.endpoint, session.session_id),
            session_id: session.session_id,
            open: true,
        })
    }
}

/// One WebDriver session; deleted on `quit` or drop
#[derive(Debug)]
pub struct WebDriverSession {
    client: Client,
    base: String,
    session_id: String,
    open: bool,
}

impl WebDriverSession {
    pub fn id(&self) -> &str {
        &self.session_id
    }

    fn get(&self, path: &str) -> Result<Value> {
        send(self.client.get(format!("{}{path}", self.base)))
    }

    fn post(&self, path: &str, body: Value) -> Result<Value> {
        send(self.client.post(format!("{}{path}", self.base)).json(&body))
    }
}

impl Browser for WebDriverSession {
    fn goto(&mut self, url: &str) -> Result<()> {
        self.post("/url", json!({ "url": url }))?;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String> {
        decode(self.get("/url")?)
    }

    fn refresh(&mut self) -> Result<()> {
        self.post("/refresh", json!({}))?;
        Ok(())
    }

    fn add_cookie(&mut self, cookie: &Cookie) -> Result<()> {
        self.post("/cookie", json!({ "cookie": cookie }))?;
        Ok(())
    }

    fn cookies(&mut self) -> Result<Vec<Cookie>> {
        decode(self.get("/cookie")?)
    }

    fn find_element(&mut self, locator: &Locator) -> Result<ElementRef> {
        let value = self
            .post(
                "/element",
                json!({ "using": locator.using, "value": locator.value }),
            )
            .map_err(|e| match e {
                RefreshError::ElementNotFound(_) => {
                    RefreshError::ElementNotFound(format!("{} {}", locator.using, locator.value))
                }
                other => other,
            })?;
        let element: WireElement = decode(value)?;
        Ok(ElementRef(element.id))
    }

    fn click(&mut self, element: &ElementRef) -> Result<()> {
        self.post(&format!("/element/{}/click", element.0), json!({}))?;
        Ok(())
    }

    fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<()> {
        self.post(&format!("/element/{}/value", element.0), json!({ "text": text }))?;
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        send(self.client.delete(&self.base))?;
        Ok(())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.quit() {
                tracing::warn!(session = %self.session_id, "Failed to close WebDriver session: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lightweight_headless_capabilities() {
        let caps = FirefoxOptions::default().capabilities();
        let firefox = &caps["capabilities"]["alwaysMatch"]["moz:firefoxOptions"];

        assert_eq!(caps["capabilities"]["alwaysMatch"]["browserName"], "firefox");
        assert_eq!(firefox["args"], json!(["-headless"]));
        assert_eq!(firefox["prefs"]["permissions.default.image"], 2);
    }

    #[test]
    fn test_plain_capabilities() {
        let caps = FirefoxOptions {
            headless: false,
            lightweight: false,
        }
        .capabilities();
        let firefox = &caps["capabilities"]["alwaysMatch"]["moz:firefoxOptions"];

        assert_eq!(firefox["args"], json!([]));
        assert_eq!(firefox["prefs"], json!({}));
    }

    /// Key under which WebDriver returns element references
    const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

    #[test]
    fn test_element_key_matches_wire_name() {
        let element: WireElement = decode(json!({ ELEMENT_KEY: "abc" })).unwrap();
        assert_eq!(element.id, "abc");
    }
}
