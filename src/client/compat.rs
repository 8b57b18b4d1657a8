//! Present-or-absent view of a backend.
//!
//! Callers that only care whether an operation produced a value can use
//! [`Lenient`], which logs each failure once and returns `None` (or an empty
//! list for `list`) in its place.

use crate::client::backends::{BackendResult, BackendVersion, CreateOptions, RepositoryBackend};
use crate::client::base::ProgressCallback;
use crate::client::datastream::Datastream;
use crate::client::permissions::{PermissionKind, PermissionSet, PrincipalDelta};
use crate::client::Oid;
use serde_json::Value;
use tracing::warn;

/// Collapse a classified result into `Option`, logging the failure
pub trait Present<T> {
    fn present(self, operation: &str) -> Option<T>;
}

impl<T> Present<T> for BackendResult<T> {
    fn present(self, operation: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("{} failed ({:?}): {}", operation, e.kind(), e);
                None
            }
        }
    }
}

/// Backend wrapper whose methods never fail, they return nothing instead
#[derive(Debug)]
pub struct Lenient {
    inner: Box<dyn RepositoryBackend>,
}

impl Lenient {
    #[must_use]
    pub fn new(inner: Box<dyn RepositoryBackend>) -> Self {
        Self { inner }
    }

    /// The wrapped backend, for callers that want the error detail
    #[must_use]
    pub fn backend(&self) -> &dyn RepositoryBackend {
        self.inner.as_ref()
    }

    #[must_use]
    pub fn into_inner(self) -> Box<dyn RepositoryBackend> {
        self.inner
    }

    #[must_use]
    pub fn version(&self) -> BackendVersion {
        self.inner.version()
    }

    pub fn set_progress(&mut self, progress: Option<ProgressCallback>) {
        self.inner.set_progress(progress);
    }

    /// Backend self-description; an empty object when it cannot be fetched
    pub async fn info(&self) -> Value {
        self.inner
            .info()
            .await
            .present("info")
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
    }

    /// All records of `package_type`; empty when the listing fails
    pub async fn list(&self, package_type: &str, start: Option<u64>) -> Vec<Oid> {
        self.inner
            .list(package_type, start.unwrap_or(0))
            .await
            .present("list")
            .unwrap_or_default()
    }

    pub async fn create_record(
        &self,
        metadata: &Value,
        package_type: &str,
        options: Option<&CreateOptions>,
    ) -> Option<Oid> {
        let default = CreateOptions::default();
        self.inner
            .create_record(metadata, package_type, options.unwrap_or(&default))
            .await
            .present("createRecord")
    }

    pub async fn get_record(&self, oid: &Oid) -> Option<Value> {
        self.inner.get_record(oid).await.present("getRecord")
    }

    pub async fn get_record_metadata(&self, oid: &Oid) -> Option<Value> {
        self.inner
            .get_record_metadata(oid)
            .await
            .present("getRecordMetadata")
    }

    pub async fn update_record_metadata(&self, oid: &Oid, metadata: &Value) -> Option<Value> {
        self.inner
            .update_record_metadata(oid, metadata)
            .await
            .present("updateRecordMetadata")
    }

    pub async fn get_permissions(&self, oid: &Oid) -> Option<PermissionSet> {
        self.inner.get_permissions(oid).await.present("getPermissions")
    }

    pub async fn grant_permission(
        &self,
        oid: &Oid,
        kind: PermissionKind,
        principals: &PrincipalDelta,
    ) -> Option<PermissionSet> {
        self.inner
            .grant_permission(oid, kind, principals)
            .await
            .present("grantPermission")
    }

    pub async fn remove_permission(
        &self,
        oid: &Oid,
        kind: PermissionKind,
        principals: &PrincipalDelta,
    ) -> Option<PermissionSet> {
        self.inner
            .remove_permission(oid, kind, principals)
            .await
            .present("removePermission")
    }

    pub async fn write_datastream(&self, oid: &Oid, dsid: &str, data: Vec<u8>) -> Option<Value> {
        self.inner
            .write_datastream(oid, dsid, data)
            .await
            .present("writeDatastream")
    }

    pub async fn read_datastream(&self, oid: &Oid, dsid: &str) -> Option<Datastream> {
        self.inner
            .read_datastream(oid, dsid)
            .await
            .present("readDatastream")
    }

    pub async fn list_datastreams(&self, oid: &Oid) -> Option<Value> {
        self.inner
            .list_datastreams(oid)
            .await
            .present("listDatastreams")
    }
}

impl From<Box<dyn RepositoryBackend>> for Lenient {
    fn from(inner: Box<dyn RepositoryBackend>) -> Self {
        Self::new(inner)
    }
}
