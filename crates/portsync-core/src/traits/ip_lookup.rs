// # IP Lookup Trait
//
// Defines the interface to an external "what is my IP" service.
//
// ## Implementations
//
// - HTTP (ipify and compatible plain-text endpoints): `portsync-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use portsync_core::{IpLookup, IpVersion};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let lookup = /* IpLookup implementation */;
//     let text = lookup.lookup(IpVersion::V6).await?;
//     println!("service said: {text}");
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::address::IpVersion;

/// Trait for public IP lookup services
///
/// Implementations return the raw response text. Validation (is this an
/// address at all, and of the requested version?) is done by
/// [`IpResolver`](crate::resolver::IpResolver) so that every backend gets the
/// same rules.
///
/// # Errors
///
/// Transport failures and non-success responses must be reported as
/// [`Error::Unreachable`](crate::Error::Unreachable). A lookup is a single
/// request; no retries.
#[async_trait]
pub trait IpLookup: Send + Sync {
    /// Fetch the public address for `version` as text
    async fn lookup(&self, version: IpVersion) -> Result<String, crate::Error>;

    /// Name of the service (for logging)
    fn service_name(&self) -> &'static str;
}
