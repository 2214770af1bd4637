//! Configuration types for portsync
//!
//! The core never reads the environment itself; the binary builds a
//! [`SyncConfig`] and hands it over.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Public IP lookup endpoints
    #[serde(default)]
    pub lookup: LookupConfig,

    /// DNS provider settings
    pub dns: DnsConfig,

    /// Router admin panel settings
    pub router: RouterConfig,

    /// Browser automation settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Where the last synced addresses live
    #[serde(default)]
    pub state: StateConfig,
}

impl SyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.lookup.validate()?;
        self.dns.validate()?;
        self.router.validate()?;
        self.browser.validate()?;
        Ok(())
    }
}

/// Public IP lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Endpoint returning the IPv4 address as plain text
    #[serde(default = "default_ipv4_lookup_url")]
    pub ipv4_url: String,

    /// Endpoint returning the IPv6 address as plain text
    #[serde(default = "default_ipv6_lookup_url")]
    pub ipv6_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,
}

impl LookupConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        for url in [&self.ipv4_url, &self.ipv6_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(crate::Error::config(format!(
                    "IP lookup URL must use HTTP or HTTPS scheme. Got: {url}"
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("IP lookup timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            ipv4_url: default_ipv4_lookup_url(),
            ipv6_url: default_ipv6_lookup_url(),
            timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

fn default_ipv4_lookup_url() -> String {
    "https://api.ipify.org/".to_string()
}

fn default_ipv6_lookup_url() -> String {
    "https://api64.ipify.org/".to_string()
}

fn default_lookup_timeout_secs() -> u64 {
    10
}

/// DNS provider configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Provider API token
    pub api_token: String,

    /// Zone holding the records
    pub zone_id: String,

    /// Records that must follow the public address
    pub record_ids: Vec<String>,
}

impl DnsConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.is_empty() {
            return Err(crate::Error::config("DNS provider API token cannot be empty"));
        }
        if self.zone_id.is_empty() {
            return Err(crate::Error::config("DNS zone id cannot be empty"));
        }
        if self.record_ids.is_empty() {
            return Err(crate::Error::config("No DNS records configured"));
        }
        if self.record_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(crate::Error::config("DNS record ids cannot be empty"));
        }
        Ok(())
    }

    /// Targets in configuration order
    pub fn targets(&self) -> Vec<crate::traits::RecordTarget> {
        self.record_ids
            .iter()
            .map(|record_id| crate::traits::RecordTarget::new(&self.zone_id, record_id))
            .collect()
    }
}

// Keeps the token out of logs
impl std::fmt::Debug for DnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsConfig")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("record_ids", &self.record_ids)
            .finish()
    }
}

/// Router admin panel configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Root URL of the admin panel
    #[serde(default = "default_router_url")]
    pub base_url: String,

    /// Admin username
    pub username: String,

    /// Admin password
    pub password: String,

    /// Port mapping entries to point at the new address
    #[serde(default)]
    pub mapping_names: Vec<String>,

    /// Upper bound for every wait on the admin UI, in seconds
    #[serde(default = "default_element_timeout_secs")]
    pub element_timeout_secs: u64,
}

impl RouterConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(crate::Error::config(format!(
                "Router URL must use HTTP or HTTPS scheme. Got: {}",
                self.base_url
            )));
        }
        if !self.mapping_names.is_empty() && self.username.is_empty() {
            return Err(crate::Error::config(
                "Router username is required when port mappings are configured",
            ));
        }
        if self.mapping_names.iter().any(|n| n.trim().is_empty()) {
            return Err(crate::Error::config("Port mapping names cannot be empty"));
        }
        if !(1..=600).contains(&self.element_timeout_secs) {
            return Err(crate::Error::config(format!(
                "Router element timeout must be between 1 and 600 seconds. Got: {}",
                self.element_timeout_secs
            )));
        }
        Ok(())
    }

    /// Credentials for the admin panel
    pub fn credentials(&self) -> crate::session::Credentials {
        crate::session::Credentials::new(&self.username, &self.password)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_router_url(),
            username: String::new(),
            password: String::new(),
            mapping_names: Vec::new(),
            element_timeout_secs: default_element_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("mapping_names", &self.mapping_names)
            .field("element_timeout_secs", &self.element_timeout_secs)
            .finish()
    }
}

fn default_router_url() -> String {
    "http://192.168.1.1".to_string()
}

fn default_element_timeout_secs() -> u64 {
    60
}

/// Browser automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver server endpoint
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Which browser to drive
    #[serde(default)]
    pub channel: BrowserChannel,

    /// Run without a visible window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Capture diagnostic screenshots after each step
    #[serde(default = "default_true")]
    pub screenshots: bool,

    /// Directory receiving screenshots
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
}

impl BrowserConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if !self.webdriver_url.starts_with("http://") && !self.webdriver_url.starts_with("https://")
        {
            return Err(crate::Error::config(format!(
                "WebDriver URL must use HTTP or HTTPS scheme. Got: {}",
                self.webdriver_url
            )));
        }
        if self.screenshots && self.screenshot_dir.as_os_str().is_empty() {
            return Err(crate::Error::config(
                "Screenshot directory cannot be empty when screenshots are enabled",
            ));
        }
        Ok(())
    }

    /// Screenshot directory, if screenshots are enabled
    pub fn screenshot_dir(&self) -> Option<PathBuf> {
        self.screenshots.then(|| self.screenshot_dir.clone())
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            channel: BrowserChannel::default(),
            headless: true,
            screenshots: true,
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

/// Browser selector understood by the WebDriver backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserChannel {
    #[default]
    Msedge,
    Chrome,
    Chromium,
    Firefox,
}

impl std::str::FromStr for BrowserChannel {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "msedge" | "edge" => Ok(BrowserChannel::Msedge),
            "chrome" => Ok(BrowserChannel::Chrome),
            "chromium" => Ok(BrowserChannel::Chromium),
            "firefox" => Ok(BrowserChannel::Firefox),
            other => Err(crate::Error::config(format!(
                "Browser channel '{other}' is not supported. \
                Supported channels: msedge, chrome, chromium, firefox"
            ))),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("./screenshots")
}

fn default_true() -> bool {
    true
}

/// State store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Directory holding one file per IP version
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".")
}
