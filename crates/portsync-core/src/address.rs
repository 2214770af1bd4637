//! Validated IP addresses tagged with their version
//!
//! Lookup services and state files hand us plain text. Everything that
//! leaves this module has already been checked to be either a dotted-quad
//! IPv4 or a colon-hex IPv6 literal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// DNS record type carrying addresses of this version
    pub fn record_type(self) -> &'static str {
        match self {
            IpVersion::V4 => "A",
            IpVersion::V6 => "AAAA",
        }
    }

    /// Numeric tag (4 or 6)
    pub fn number(self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// A public address that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    ip: IpAddr,
}

impl Address {
    /// Parse address text, trimming surrounding whitespace
    ///
    /// Anything that is not a plain IPv4 or IPv6 literal (host names,
    /// CIDR suffixes, zone ids, empty strings) is rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        trimmed
            .parse::<IpAddr>()
            .map(|ip| Self { ip })
            .map_err(|_| Error::InvalidAddress(trimmed.to_string()))
    }

    /// Version of this address
    pub fn version(&self) -> IpVersion {
        match self.ip {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// The underlying address
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// DNS record type for this address
    pub fn record_type(&self) -> &'static str {
        self.version().record_type()
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Self { ip }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ip.fmt(f)
    }
}

/// Detect the version of address text
pub fn version_of(text: &str) -> Result<IpVersion> {
    Address::parse(text).map(|a| a.version())
}
