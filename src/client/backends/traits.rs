use crate::client::base::{encode_value, ProgressCallback};
use crate::client::datastream::Datastream;
use crate::client::pagination::{collect_ids, Page};
use crate::client::permissions::{PermissionKind, PermissionSet, PrincipalDelta};
use crate::client::Oid;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Which repository API a backend speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BackendVersion {
    /// ReDBox 1.9 API with a Solr index alongside
    Redbox1,
    /// ReDBox 2.0 portal API
    Redbox2,
}

impl BackendVersion {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redbox1 => "Redbox1",
            Self::Redbox2 => "Redbox2",
        }
    }
}

/// Only the exact tag `Redbox1` selects the 1.9 API; every other value,
/// including typos, falls back to `Redbox2`.
impl From<&str> for BackendVersion {
    fn from(tag: &str) -> Self {
        if tag == "Redbox1" {
            Self::Redbox1
        } else {
            Self::Redbox2
        }
    }
}

impl From<String> for BackendVersion {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<BackendVersion> for String {
    fn from(version: BackendVersion) -> Self {
        version.as_str().to_string()
    }
}

impl fmt::Display for BackendVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad class of a backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network, DNS or timeout failure, or a body that could not be read
    Transport,
    /// The server answered with a non-2xx status
    Status,
    /// The server answered 2xx but the payload was not what we expected
    Shape,
    /// The backend has no way to perform the operation
    Unsupported,
}

/// Errors that can occur during backend operations
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Unexpected response: {0}")]
    Shape(String),

    #[error("{operation} is not supported by {backend}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },
}

impl BackendError {
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::Transport,
            Self::Status { .. } => FailureKind::Status,
            Self::Shape(_) => FailureKind::Shape,
            Self::Unsupported { .. } => FailureKind::Unsupported,
        }
    }

    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::Shape(message.into())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Status {
                code: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_timeout() {
            Self::Transport(format!("Timeout: {err}"))
        } else if err.is_connect() {
            Self::Transport(format!("Connection failed: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Options accepted when creating a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Ask the repository to use this oid instead of minting one
    pub oid: Option<String>,
    /// Skip the reindex that normally follows a create
    pub skip_reindex: bool,
}

impl CreateOptions {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(oid) = &self.oid {
            params.push(("oid", encode_value(oid)));
        }
        if self.skip_reindex {
            params.push(("skipReindex", "true".to_string()));
        }
        params
    }
}

/// Uniform contract over the repository APIs.
///
/// Every method reports failure through [`BackendError`]; nothing is retried.
/// Wrap a backend in [`crate::client::Lenient`] to get the plain
/// present-or-absent results instead.
#[async_trait]
pub trait RepositoryBackend: Send + Sync + fmt::Debug {
    /// API version this backend speaks
    fn version(&self) -> BackendVersion;

    /// Install a hook for progress messages during multi-page operations,
    /// or remove it with `None`.
    ///
    /// The hook runs on the calling task between requests. It must return
    /// quickly and must not call back into the backend.
    fn set_progress(&mut self, progress: Option<ProgressCallback>);

    /// Self-description of the server, or an empty object if it has none
    async fn info(&self) -> BackendResult<Value>;

    /// Lazily fetch the pages of records of `package_type`, starting at
    /// `start`
    fn pages<'a>(&'a self, package_type: &'a str, start: u64) -> BoxStream<'a, BackendResult<Page>>;

    /// Every record of `package_type` from `start` on, in page order
    async fn list(&self, package_type: &str, start: u64) -> BackendResult<Vec<Oid>> {
        collect_ids(self.pages(package_type, start)).await
    }

    /// Create a record and return the oid the repository assigned
    async fn create_record(
        &self,
        metadata: &Value,
        package_type: &str,
        options: &CreateOptions,
    ) -> BackendResult<Oid>;

    /// The metadata stored in the record
    async fn get_record(&self, oid: &Oid) -> BackendResult<Value>;

    /// Metadata about the record (owner, package type, timestamps)
    async fn get_record_metadata(&self, oid: &Oid) -> BackendResult<Value>;

    async fn update_record_metadata(&self, oid: &Oid, metadata: &Value) -> BackendResult<Value>;

    async fn get_permissions(&self, oid: &Oid) -> BackendResult<PermissionSet>;

    /// Add principals to `kind`, returning the permissions after the
    /// server has merged them
    async fn grant_permission(
        &self,
        oid: &Oid,
        kind: PermissionKind,
        principals: &PrincipalDelta,
    ) -> BackendResult<PermissionSet>;

    /// Remove principals from `kind`, returning the permissions after the
    /// server has subtracted them
    async fn remove_permission(
        &self,
        oid: &Oid,
        kind: PermissionKind,
        principals: &PrincipalDelta,
    ) -> BackendResult<PermissionSet>;

    async fn write_datastream(&self, oid: &Oid, dsid: &str, data: Vec<u8>) -> BackendResult<Value>;

    async fn read_datastream(&self, oid: &Oid, dsid: &str) -> BackendResult<Datastream>;

    async fn list_datastreams(&self, oid: &Oid) -> BackendResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_tag_fallback() {
        assert_eq!(BackendVersion::from("Redbox1"), BackendVersion::Redbox1);
        assert_eq!(BackendVersion::from("Redbox2"), BackendVersion::Redbox2);
        assert_eq!(BackendVersion::from("redbox1"), BackendVersion::Redbox2);
        assert_eq!(BackendVersion::from(""), BackendVersion::Redbox2);
    }

    #[test]
    fn test_version_serde() {
        let v: BackendVersion = serde_json::from_str("\"Redbox1\"").unwrap();
        assert_eq!(v, BackendVersion::Redbox1);
        let v: BackendVersion = serde_json::from_str("\"Redbox3\"").unwrap();
        assert_eq!(v, BackendVersion::Redbox2);
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"Redbox2\"");
    }

    #[test]
    fn test_error_kinds() {
        let err = BackendError::Status {
            code: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.kind(), FailureKind::Status);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "HTTP 404: not found");

        let err = BackendError::Unsupported {
            backend: "Redbox1",
            operation: "grantPermission",
        };
        assert_eq!(err.kind(), FailureKind::Unsupported);
        assert_eq!(err.to_string(), "grantPermission is not supported by Redbox1");
    }

    #[test]
    fn test_create_options_params() {
        assert!(CreateOptions::default().to_params().is_empty());
        let options = CreateOptions {
            oid: Some("fixed-oid".to_string()),
            skip_reindex: true,
        };
        assert_eq!(
            options.to_params(),
            vec![
                ("oid", "fixed-oid".to_string()),
                ("skipReindex", "true".to_string())
            ]
        );

        let options = CreateOptions {
            oid: Some("a+b&c".to_string()),
            skip_reindex: false,
        };
        assert_eq!(options.to_params(), vec![("oid", "a%2Bb%26c".to_string())]);
    }
}
