// # Cloudflare DNS Record Updater
//
// This crate provides a Cloudflare implementation of DnsRecordUpdater.
//
// ## Behavior
//
// - One PATCH per record and run, addressed by zone id and record id
// - The record type (A/AAAA) follows the address version
// - A non-success answer is reported as `Ok(false)` after logging why;
//   only an unreachable API is an error
// - No retries, no caching, no record lookup by name
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - The token is passed in explicitly; nothing here reads the environment
// - Construction fails fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use portsync_core::traits::{DnsRecordUpdater, RecordTarget};
use portsync_core::{Address, Error, Result};
use reqwest::StatusCode;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare DNS record updater
///
/// The Debug implementation does NOT expose the API token.
pub struct CloudflareUpdater {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API root, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareUpdater")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareUpdater {
    /// Create a new Cloudflare updater
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is empty or the HTTP client cannot be
    /// built.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Send requests to another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn record_url(&self, target: &RecordTarget) -> String {
        format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, target.zone_id, target.record_id
        )
    }
}

/// Human-readable reason for a rejected update
fn classify(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "request rejected (bad content or record type)",
        401 | 403 => "authentication failed: invalid API token or insufficient permissions",
        404 => "zone or record not found",
        429 => "rate limit exceeded",
        500..=599 => "Cloudflare server error",
        _ => "unexpected status",
    }
}

#[async_trait]
impl DnsRecordUpdater for CloudflareUpdater {
    /// Point one record at `address`
    ///
    /// # API Call
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// Authorization: Bearer <token>
    /// {
    ///   "content": "2001:db8::1",
    ///   "type": "A" or "AAAA"
    /// }
    /// ```
    async fn update(&self, target: &RecordTarget, address: &Address) -> Result<bool> {
        let record_type = address.record_type();
        let payload = serde_json::json!({
            "content": address.to_string(),
            "type": record_type,
        });

        tracing::debug!(
            "Updating Cloudflare DNS record {} -> {} ({})",
            target,
            address,
            record_type
        );

        let response = self
            .client
            .patch(self.record_url(target))
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::unreachable(format!("Cloudflare API request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());
        tracing::info!("Cloudflare response for {}: {}", target.record_id, body);

        if status == StatusCode::OK {
            tracing::info!("DNS record {} updated to {}", target.record_id, address);
            Ok(true)
        } else {
            tracing::warn!(
                "Cloudflare did not update record {}: {} (HTTP {})",
                target.record_id,
                classify(status),
                status
            );
            Ok(false)
        }
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
