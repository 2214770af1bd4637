// # HTTP IP Lookup
//
// This crate provides an HTTP-based IpLookup for portsync.
//
// ## Purpose
//
// Asks a plain-text "what is my IP" service (ipify by default) for the
// public address. The v4 and v6 endpoints are separate: the v6 endpoint
// answers over whichever protocol the connection used, so a host without
// IPv6 connectivity gets an IPv4 address back. Detecting that is the
// resolver's job, not ours.
//
// ## Architecture
//
// One GET per lookup, no caching, no retries. Proxies configured in the
// environment are ignored: a proxy would report its own address.

use async_trait::async_trait;
use portsync_core::config::LookupConfig;
use portsync_core::traits::IpLookup;
use portsync_core::{Error, IpVersion, Result};
use std::time::Duration;

/// HTTP-based public IP lookup
pub struct HttpIpLookup {
    /// Endpoint for IPv4 lookups
    ipv4_url: String,

    /// Endpoint for IPv6 lookups
    ipv6_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpLookup {
    /// Create a lookup against the ipify endpoints
    pub fn new() -> Result<Self> {
        Self::from_config(&LookupConfig::default())
    }

    /// Create a lookup from configuration
    pub fn from_config(config: &LookupConfig) -> Result<Self> {
        Self::with_urls(
            &config.ipv4_url,
            &config.ipv6_url,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Create a lookup against custom endpoints
    pub fn with_urls(ipv4_url: &str, ipv6_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            ipv4_url: ipv4_url.to_string(),
            ipv6_url: ipv6_url.to_string(),
            client,
        })
    }

    fn url(&self, version: IpVersion) -> &str {
        match version {
            IpVersion::V4 => &self.ipv4_url,
            IpVersion::V6 => &self.ipv6_url,
        }
    }
}

impl std::fmt::Debug for HttpIpLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIpLookup")
            .field("ipv4_url", &self.ipv4_url)
            .field("ipv6_url", &self.ipv6_url)
            .finish()
    }
}

#[async_trait]
impl IpLookup for HttpIpLookup {
    async fn lookup(&self, version: IpVersion) -> Result<String> {
        let url = self.url(version);
        tracing::debug!("Looking up public IP{} address at {}", version, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::unreachable(format!("Request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::unreachable(format!("{url} answered with HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| Error::unreachable(format!("Failed to read response from {url}: {e}")))
    }

    fn service_name(&self) -> &'static str {
        "http"
    }
}
