//! Connection configuration for repository servers.
//!
//! Servers are read from a TOML file, layered with environment variables
//! prefixed `REDBOX_API` and using `__` as the nesting separator, e.g.
//! `REDBOX_API__HTTP__TIMEOUT_SECS=60`. Environment keys are lowercased, so
//! servers overridden that way must have lowercase names.
//!
//! ```toml
//! [servers.Test1_9]
//! version = "Redbox1"
//! base_url = "http://localhost:9000/redbox/api/v1"
//! api_key = "..."
//! solr_url = "http://localhost:9000/solr/fascinator"
//!
//! [servers.Test2_0]
//! version = "Redbox2"
//! base_url = "http://localhost:1500"
//! api_key = "..."
//! branding = "default"
//! portal = "rdmp"
//! ```

use crate::client::{BackendVersion, HttpClientConfig};
use crate::{Error, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const ENV_PREFIX: &str = "REDBOX_API";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpClientConfig,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

/// Connection record for one repository server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API version tag; anything but `Redbox1` means `Redbox2`
    #[serde(default = "default_version")]
    pub version: BackendVersion,
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Solr core holding the `security_exception` field (Redbox1)
    #[serde(default)]
    pub solr_url: Option<String>,
    /// First routing segment of the portal (Redbox2)
    #[serde(default)]
    pub branding: Option<String>,
    /// Second routing segment of the portal (Redbox2)
    #[serde(default)]
    pub portal: Option<String>,
    /// Path template for metadata updates on Redbox2, `{oid}` is replaced
    #[serde(default)]
    pub update_metadata_path: Option<String>,
}

const fn default_version() -> BackendVersion {
    BackendVersion::Redbox2
}

impl ServerConfig {
    pub(crate) fn require<'a>(value: Option<&'a String>, field: &str, version: BackendVersion) -> Result<&'a str> {
        value
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::invalid(field, format!("required for {version} servers")))
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location if no
    /// path is given and a file exists there
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if let Some(default) = Self::default_path() {
                    debug!("Looking for configuration at {}", default.display());
                    builder = builder.add_source(File::from(default).required(false));
                }
            }
        }

        let config: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, without environment overrides
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/redbox-api/config.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("redbox-api").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(Error::invalid("http.timeout_secs", "must be greater than zero"));
        }
        if self.http.connect_timeout_secs == 0 {
            return Err(Error::invalid(
                "http.connect_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.servers.is_empty() {
            return Err(Error::invalid("servers", "at least one server must be configured"));
        }
        for (name, server) in &self.servers {
            if server.base_url.trim().is_empty() {
                return Err(Error::invalid(
                    &format!("servers.{name}.base_url"),
                    "cannot be empty",
                ));
            }
        }
        Ok(())
    }

    /// Look up a server by name. Names are matched case-insensitively when
    /// there is no exact match, since environment overrides lowercase them.
    pub fn server(&self, name: &str) -> Result<&ServerConfig> {
        let found = self.servers.get(name).or_else(|| {
            self.servers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, server)| server)
        });
        found.ok_or_else(|| {
            let known = self.servers.keys().cloned().collect::<Vec<_>>().join(", ");
            Error::invalid("server", format!("'{name}' is not configured (known: {known})"))
        })
    }
}
