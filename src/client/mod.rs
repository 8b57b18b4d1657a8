pub mod backends;
pub mod base;
pub mod compat;
pub mod datastream;
pub mod pagination;
pub mod permissions;

pub use backends::{
    connect, BackendError, BackendResult, BackendVersion, CreateOptions, FailureKind,
    RepositoryBackend,
};
pub use base::{ProgressCallback, RequestBase};
pub use compat::{Lenient, Present};
pub use datastream::Datastream;
pub use pagination::Page;
pub use permissions::{PermissionKind, PermissionSet, PrincipalDelta};

use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client configuration shared by every backend transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
}

impl HttpClientConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: concat!("redbox-api/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Object identifier assigned by the repository
///
/// Oids are opaque, but they are spliced into request paths, so anything
/// containing a path separator or whitespace is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new oid from a string, validating the format
    pub fn new(oid: &str) -> Result<Self> {
        let cleaned = oid.trim();

        if cleaned.is_empty() {
            return Err(crate::Error::invalid("oid", "oid cannot be empty"));
        }

        if cleaned.contains('/') || cleaned.chars().any(char::is_whitespace) {
            return Err(crate::Error::invalid(
                "oid",
                format!("'{cleaned}' contains a path separator or whitespace"),
            ));
        }

        Ok(Self(cleaned.to_string()))
    }

    /// Get the oid string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Oid {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Oid {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
