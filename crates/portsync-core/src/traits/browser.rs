// # Browser Driver Trait
//
// Defines the automation capability the router session needs from a
// browser engine: navigate, call a page script, fill, click, wait, capture.
//
// ## Implementations
//
// - W3C WebDriver (chromedriver, msedgedriver, geckodriver):
//   `portsync-router-webdriver` crate
//
// The router session only talks to this trait, so the session logic does
// not depend on any specific automation engine.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// How to find an element on the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector
    Css(String),

    /// Row of the table matching `table` (CSS) whose rendered text
    /// contains `text`
    TableRow { table: String, text: String },

    /// Selection checkbox inside the row described as in `TableRow`
    RowCheckbox { table: String, text: String },
}

impl Locator {
    /// CSS selector locator
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "{selector}"),
            Locator::TableRow { table, text } => write!(f, "{table} row containing {text:?}"),
            Locator::RowCheckbox { table, text } => {
                write!(f, "checkbox of {table} row containing {text:?}")
            }
        }
    }
}

/// Trait for browser automation backends
///
/// A driver drives exactly one page. It is owned by one router session and
/// used strictly sequentially.
///
/// # Errors
///
/// - `wait_for` reports a missed deadline as `Error::ElementTimeout`
/// - everything else the backend cannot do is `Error::Driver`
/// - calls before `launch` succeed are `Error::NotReady`
#[async_trait]
pub trait BrowserDriver: Send {
    /// Open the browser and its page
    async fn launch(&mut self) -> Result<(), crate::Error>;

    /// Load `url` in the page
    async fn navigate(&mut self, url: &str) -> Result<(), crate::Error>;

    /// Call the page's global script function named `function`
    async fn invoke(&mut self, function: &str) -> Result<(), crate::Error>;

    /// Replace the value of the input found by `locator`
    async fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), crate::Error>;

    /// Click the element found by `locator`
    async fn click(&mut self, locator: &Locator) -> Result<(), crate::Error>;

    /// Wait until the element found by `locator` is visible
    async fn wait_for(&mut self, locator: &Locator, timeout: Duration)
    -> Result<(), crate::Error>;

    /// Save a PNG of the current page to `path`
    async fn screenshot(&mut self, path: &Path) -> Result<(), crate::Error>;

    /// Release the browser
    async fn close(&mut self) -> Result<(), crate::Error>;
}

/// Creates one fresh driver per router session
pub trait BrowserDriverFactory: Send + Sync {
    /// Create a driver that has not been launched yet
    fn create(&self) -> Result<Box<dyn BrowserDriver>, crate::Error>;
}
