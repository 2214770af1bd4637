//! Router admin session
//!
//! A [`RouterSession`] drives the admin panel through a [`BrowserDriver`]
//! as an explicit state machine:
//!
//! ```text
//!  Idle ──start──▶ Unstarted ──authenticate──▶ Authenticated
//!                                                   │
//!                                          goto_mapping_page
//!                                                   ▼
//!                                            OnMappingPage ◀─┐
//!                                                   │        │
//!                                                   └─edit───┘
//!
//!  any failing step ──▶ Faulted          any state ──close──▶ Closed
//! ```
//!
//! The session is single-use. It logs in once and then edits as many
//! mapping entries as needed on the same page. Operations called in the
//! wrong state fail with `Error::NotReady` without touching the browser.

pub mod profile;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::error::{Error, Result};
use crate::traits::{BrowserDriver, Locator};

pub use profile::RouterProfile;

/// Screenshot file names, one per step
pub const LOGIN_SCREENSHOT: &str = "login.png";
pub const MAPPING_PAGE_SCREENSHOT: &str = "mapping-page.png";
pub const MAPPING_SELECTED_SCREENSHOT: &str = "mapping-selected.png";
pub const ERROR_SCREENSHOT: &str = "error.png";

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Browser not acquired yet
    Idle,
    /// Browser acquired, not logged in
    Unstarted,
    /// Logged in
    Authenticated,
    /// Port mapping page loaded
    OnMappingPage,
    /// A step failed; only `close` is allowed
    Faulted,
    /// Browser released
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Unstarted => "unstarted",
            SessionState::Authenticated => "authenticated",
            SessionState::OnMappingPage => "on mapping page",
            SessionState::Faulted => "faulted",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Admin panel credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Stateful driver of the router admin panel
pub struct RouterSession {
    driver: Box<dyn BrowserDriver>,
    profile: RouterProfile,
    timeout: Duration,
    screenshot_dir: Option<PathBuf>,
    state: SessionState,
}

impl RouterSession {
    /// Create a session; nothing happens until [`start`](Self::start)
    pub fn new(driver: Box<dyn BrowserDriver>, profile: RouterProfile, timeout: Duration) -> Self {
        Self {
            driver,
            profile,
            timeout,
            screenshot_dir: None,
            state: SessionState::Idle,
        }
    }

    /// Capture diagnostic screenshots into `dir` after each step
    pub fn with_screenshots(mut self, dir: Option<PathBuf>) -> Self {
        self.screenshot_dir = dir;
        self
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Acquire the browser
    pub async fn start(&mut self) -> Result<()> {
        self.require("start", &[SessionState::Idle])?;

        if let Some(dir) = &self.screenshot_dir {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                warn!("Failed to create screenshot directory {}: {}", dir.display(), e);
            }
        }

        match self.driver.launch().await {
            Ok(()) => {
                debug!("Browser launched");
                self.state = SessionState::Unstarted;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Faulted;
                Err(e)
            }
        }
    }

    /// Log in to the admin panel
    ///
    /// Fails with `Error::Authentication` when the post-login marker does
    /// not show up within the timeout, or when any login step fails.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        self.require("authenticate", &[SessionState::Unstarted])?;

        debug!("Opening login page");
        if let Err(e) = self.login(credentials).await {
            return Err(self.fault(Error::Authentication(e.to_string())).await);
        }

        info!("Logged in to router admin panel");
        self.state = SessionState::Authenticated;
        self.capture(LOGIN_SCREENSHOT).await;
        Ok(())
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        let profile = &self.profile;
        self.driver.navigate(&profile.root_url()).await?;
        self.driver.invoke(&profile.login_trigger).await?;
        self.driver
            .fill(&Locator::css(&profile.username_field), &credentials.username)
            .await?;
        self.driver
            .fill(&Locator::css(&profile.password_field), &credentials.password)
            .await?;
        self.driver.invoke(&profile.submit_trigger).await?;
        self.driver
            .wait_for(&Locator::css(&profile.logged_in_marker), self.timeout)
            .await
    }

    /// Load the port mapping page
    ///
    /// A no-op when the page is already loaded.
    pub async fn goto_mapping_page(&mut self) -> Result<()> {
        if self.state == SessionState::OnMappingPage {
            return Ok(());
        }
        self.require("goto_mapping_page", &[SessionState::Authenticated])?;

        let url = self.profile.mapping_url();
        debug!("Opening port mapping page");
        let loaded = match self.driver.navigate(&url).await {
            Ok(()) => {
                self.driver
                    .wait_for(&Locator::css(&self.profile.mapping_table), self.timeout)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = loaded {
            return Err(self.fault(Error::Navigation(format!("{url}: {e}"))).await);
        }

        debug!("Port mapping page loaded");
        self.state = SessionState::OnMappingPage;
        self.capture(MAPPING_PAGE_SCREENSHOT).await;
        Ok(())
    }

    /// Point the mapping entry `name` at `address`
    ///
    /// Loads the mapping page first when called right after login. The
    /// entry is found by the label the panel renders for it (see
    /// [`RouterProfile::search_label`]).
    pub async fn set_mapping_target(&mut self, name: &str, address: &Address) -> Result<()> {
        if self.state == SessionState::Authenticated {
            self.goto_mapping_page().await?;
        }
        self.require("set_mapping_target", &[SessionState::OnMappingPage])?;

        let label = self.profile.search_label(name);
        let table = self.profile.mapping_table.clone();
        let row = Locator::TableRow {
            table: table.clone(),
            text: label.clone(),
        };

        match self.driver.wait_for(&row, self.timeout).await {
            Ok(()) => debug!("Found port mapping entry {:?}", label),
            Err(Error::ElementTimeout { .. }) => {
                return Err(self
                    .fault(Error::MappingNotFound {
                        name: name.to_string(),
                    })
                    .await);
            }
            Err(e) => return Err(self.fault(e).await),
        }

        if let Err(e) = self.edit_row(&table, &label, address).await {
            return Err(self.fault(Error::mapping_edit(name, e.to_string())).await);
        }

        info!("Port mapping {} now points at {}", name, address);
        Ok(())
    }

    async fn edit_row(&mut self, table: &str, label: &str, address: &Address) -> Result<()> {
        let checkbox = Locator::RowCheckbox {
            table: table.to_string(),
            text: label.to_string(),
        };
        self.driver.click(&checkbox).await?;
        debug!("Opened edit form");

        let field = Locator::css(&self.profile.internal_client_field);
        self.driver.wait_for(&field, self.timeout).await?;
        self.driver.fill(&field, &address.to_string()).await?;
        debug!("Internal client set to {}", address);
        self.capture(MAPPING_SELECTED_SCREENSHOT).await;

        let apply = Locator::css(&self.profile.apply_button);
        self.driver.click(&apply).await?;
        debug!("Submitted edit form");
        Ok(())
    }

    /// Release the browser
    ///
    /// Allowed from every state. Only the first call reaches the driver.
    pub async fn close(&mut self) -> Result<()> {
        let previous = std::mem::replace(&mut self.state, SessionState::Closed);
        match previous {
            SessionState::Closed => Ok(()),
            SessionState::Idle => Ok(()),
            _ => {
                debug!("Closing browser (session was {})", previous);
                self.driver.close().await
            }
        }
    }

    fn require(&self, operation: &str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::not_ready(format!(
                "{operation} is not allowed while the session is {}",
                self.state
            )))
        }
    }

    async fn fault(&mut self, err: Error) -> Error {
        self.state = SessionState::Faulted;
        self.capture(ERROR_SCREENSHOT).await;
        err
    }

    async fn capture(&mut self, file_name: &str) {
        let Some(dir) = &self.screenshot_dir else {
            return;
        };
        let path = dir.join(file_name);
        if let Err(e) = self.driver.screenshot(&path).await {
            warn!("Failed to save screenshot {}: {}", path.display(), e);
        }
    }
}

impl Drop for RouterSession {
    fn drop(&mut self) {
        if !matches!(self.state, SessionState::Idle | SessionState::Closed) {
            warn!("Router session dropped without close (state: {})", self.state);
        }
    }
}
