// # WebDriver Browser Driver
//
// This crate drives a real browser through a W3C WebDriver server
// (msedgedriver, chromedriver or geckodriver) for the router session.
//
// ## Purpose
//
// The router's admin panel only works in a browser: login and form
// submission go through the page's own scripts. The WebDriver server owns
// the browser process; this crate only speaks its JSON-over-HTTP protocol.
//
// ## Architecture
//
// - One WebDriver session per `WebDriverBrowser`, created by `launch` and
//   deleted by `close`
// - Table-row locators are resolved in two steps: the table by CSS, then
//   the row inside it by a relative XPath on its text
// - Waits poll every 250 ms; a missing element is not an error until the
//   deadline passes
//
// ## Usage
//
// ```rust,ignore
// use portsync_core::{BrowserConfig, BrowserDriverFactory};
// use portsync_router_webdriver::WebDriverFactory;
//
// let factory = WebDriverFactory::new(&BrowserConfig::default())?;
// let mut driver = factory.create()?;
// driver.launch().await?;
// driver.navigate("http://192.168.1.1").await?;
// driver.close().await?;
// ```

pub mod protocol;

use async_trait::async_trait;
use portsync_core::traits::{BrowserDriver, BrowserDriverFactory, Locator};
use portsync_core::{BrowserChannel, BrowserConfig, Error, Result};
use protocol::WireError;
use reqwest::Method;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

/// Interval between visibility checks
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound for a single WebDriver command (page loads included)
const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Creates WebDriver-backed browsers from configuration
#[derive(Debug, Clone)]
pub struct WebDriverFactory {
    server_url: String,
    channel: BrowserChannel,
    headless: bool,
    client: reqwest::Client,
}

impl WebDriverFactory {
    /// Create a factory for the server and browser named in `config`
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(COMMAND_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            server_url: config.webdriver_url.trim_end_matches('/').to_string(),
            channel: config.channel,
            headless: config.headless,
            client,
        })
    }
}

impl BrowserDriverFactory for WebDriverFactory {
    fn create(&self) -> Result<Box<dyn BrowserDriver>> {
        Ok(Box::new(WebDriverBrowser {
            server_url: self.server_url.clone(),
            channel: self.channel,
            headless: self.headless,
            client: self.client.clone(),
            session_id: None,
        }))
    }
}

/// A browser page driven over WebDriver
#[derive(Debug)]
pub struct WebDriverBrowser {
    server_url: String,
    channel: BrowserChannel,
    headless: bool,
    client: reqwest::Client,
    /// Set between `launch` and `close`
    session_id: Option<String>,
}

impl WebDriverBrowser {
    fn session_url(&self) -> Result<String> {
        match &self.session_id {
            Some(id) => Ok(format!("{}/session/{}", self.server_url, id)),
            None => Err(Error::not_ready("browser has not been launched")),
        }
    }

    /// Send one command; the outer error is transport, the inner one the
    /// WebDriver error payload
    async fn raw_command(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<std::result::Result<Value, WireError>> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::driver(format!("WebDriver server unreachable: {e}")))?;
        let status = response.status();
        let mut payload: Value = response
            .json()
            .await
            .map_err(|e| Error::driver(format!("Malformed WebDriver response ({status}): {e}")))?;
        let value = payload
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null);

        if status.is_success() {
            return Ok(Ok(value));
        }
        match serde_json::from_value::<WireError>(value) {
            Ok(wire) => Ok(Err(wire)),
            Err(_) => Ok(Err(WireError {
                error: "unknown error".to_string(),
                message: format!("HTTP {status}"),
            })),
        }
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.session_url()?, path);
        self.raw_command(method, &url, body)
            .await?
            .map_err(|wire| Error::driver(wire.to_string()))
    }

    /// Look up one element, `None` when nothing matches
    async fn find_from(&self, scope: &str, using: &str, value: &str) -> Result<Option<String>> {
        let url = format!("{}{}", self.session_url()?, scope);
        match self
            .raw_command(Method::POST, &url, Some(protocol::find_body(using, value)))
            .await?
        {
            Ok(found) => protocol::element_id(&found)
                .map(Some)
                .ok_or_else(|| Error::driver("Element reference missing from response")),
            Err(wire) if wire.error == protocol::NO_SUCH_ELEMENT => Ok(None),
            Err(wire) => Err(Error::driver(wire.to_string())),
        }
    }

    async fn find(&self, locator: &Locator) -> Result<Option<String>> {
        match locator {
            Locator::Css(selector) => self.find_from("/element", "css selector", selector).await,
            Locator::TableRow { table, text } => {
                self.find_in_table(table, &protocol::row_xpath(text)).await
            }
            Locator::RowCheckbox { table, text } => {
                self.find_in_table(table, &protocol::row_checkbox_xpath(text))
                    .await
            }
        }
    }

    async fn find_in_table(&self, table: &str, xpath: &str) -> Result<Option<String>> {
        let Some(table_id) = self.find_from("/element", "css selector", table).await? else {
            return Ok(None);
        };
        self.find_from(&format!("/element/{table_id}/element"), "xpath", xpath)
            .await
    }

    /// Find an element that must exist now
    async fn require(&self, locator: &Locator) -> Result<String> {
        self.find(locator)
            .await?
            .ok_or_else(|| Error::driver(format!("no such element: {locator}")))
    }

    /// Whether the element is found and displayed right now
    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        let Some(element) = self.find(locator).await? else {
            return Ok(false);
        };

        let url = format!("{}/element/{}/displayed", self.session_url()?, element);
        match self.raw_command(Method::GET, &url, None).await? {
            Ok(displayed) => Ok(displayed.as_bool().unwrap_or(false)),
            Err(wire) if wire.error == protocol::STALE_ELEMENT => Ok(false),
            Err(wire) => Err(Error::driver(wire.to_string())),
        }
    }
}

#[async_trait]
impl BrowserDriver for WebDriverBrowser {
    async fn launch(&mut self) -> Result<()> {
        if self.session_id.is_some() {
            return Err(Error::not_ready("browser already launched"));
        }

        let body = protocol::new_session_body(self.channel, self.headless);
        let url = format!("{}/session", self.server_url);
        let value = self
            .raw_command(Method::POST, &url, Some(body))
            .await?
            .map_err(|wire| Error::driver(format!("Failed to start browser: {wire}")))?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::driver("WebDriver did not return a session id"))?;

        tracing::debug!("WebDriver session {} started ({:?})", session_id, self.channel);
        self.session_id = Some(session_id.to_string());
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn invoke(&mut self, function: &str) -> Result<()> {
        let body = json!({ "script": protocol::INVOKE_SCRIPT, "args": [function] });
        self.command(Method::POST, "/execute/sync", Some(body))
            .await?;
        Ok(())
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> Result<()> {
        let element = self.require(locator).await?;
        self.command(Method::POST, &format!("/element/{element}/clear"), Some(json!({})))
            .await?;
        self.command(
            Method::POST,
            &format!("/element/{element}/value"),
            Some(json!({ "text": value })),
        )
        .await?;
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> Result<()> {
        let element = self.require(locator).await?;
        self.command(Method::POST, &format!("/element/{element}/click"), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<()> {
        self.session_url()?;
        let deadline = Instant::now() + timeout;

        loop {
            if self.is_visible(locator).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::ElementTimeout {
                    locator: locator.to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn screenshot(&mut self, path: &Path) -> Result<()> {
        use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

        let value = self.command(Method::GET, "/screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| Error::driver("Screenshot response is not a string"))?;
        let png = BASE64
            .decode(encoded)
            .map_err(|e| Error::driver(format!("Screenshot is not valid base64: {e}")))?;

        tokio::fs::write(path, png).await?;
        tracing::debug!("Screenshot saved to {}", path.display());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let Ok(url) = self.session_url() else {
            return Ok(());
        };
        self.session_id = None;

        self.raw_command(Method::DELETE, &url, None)
            .await?
            .map_err(|wire| Error::driver(format!("Failed to end browser session: {wire}")))?;
        tracing::debug!("WebDriver session closed");
        Ok(())
    }
}
