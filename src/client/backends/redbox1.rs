use super::oid_from_response;
use super::traits::{
    BackendError, BackendResult, BackendVersion, CreateOptions, RepositoryBackend,
};
use crate::client::base::{encode_value, ProgressCallback, RequestBase};
use crate::client::datastream::Datastream;
use crate::client::pagination::{paginate, Page};
use crate::client::permissions::{PermissionKind, PermissionSet, PrincipalDelta};
use crate::client::{HttpClientConfig, Oid};
use crate::config::ServerConfig;
use crate::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

const NAME: &str = "Redbox1";

/// Solr-style search envelope, shared by the API search and the index
#[derive(Debug, Deserialize)]
struct SearchEnvelope<D> {
    response: SearchResponse<D>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse<D> {
    num_found: u64,
    docs: Vec<D>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SecurityDoc {
    #[serde(default)]
    security_exception: Vec<String>,
}

/// Client for the ReDBox 1.9 API.
///
/// ReDBox 1.9 has no permissions endpoint. The record owner has view and
/// edit; extra viewers granted through the web front end are only recorded
/// in the Solr index as `security_exception`, so a second transport talks
/// to Solr directly.
#[derive(Debug)]
pub struct Redbox1 {
    api: RequestBase,
    solr: RequestBase,
}

impl Redbox1 {
    pub fn new(server: &ServerConfig, http: &HttpClientConfig) -> Result<Self> {
        let solr_url = ServerConfig::require(server.solr_url.as_ref(), "solr_url", BackendVersion::Redbox1)?;

        let api = RequestBase::new(&server.base_url, server.api_key.as_deref(), http)?;
        let solr = RequestBase::new(solr_url, None, http)?;

        info!("Initialized {} client (solr: {})", NAME, solr.base_url());
        Ok(Self { api, solr })
    }

    async fn fetch_page(&self, package_type: &str, start: u64) -> BackendResult<Page> {
        self.api
            .report_progress(&format!("Searching for {package_type}: {start}"));

        let params = [
            ("q", format!("packageType:{package_type}")),
            ("start", start.to_string()),
        ];
        let body = self.api.get("search", Some(&params[..])).await?;
        let envelope: SearchEnvelope<SearchDoc> = serde_json::from_value(body)
            .map_err(|e| BackendError::shape(format!("search response: {e}")))?;

        let ids = envelope
            .response
            .docs
            .into_iter()
            .map(|doc| Oid::new(&doc.id))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| BackendError::shape(format!("search response: {e}")))?;

        debug!(
            "{} page at {}: {} of {} {} records",
            NAME,
            start,
            ids.len(),
            envelope.response.num_found,
            package_type
        );

        Ok(Page {
            start,
            num_found: envelope.response.num_found,
            ids,
        })
    }

    /// Extra viewers of `oid` recorded in the Solr index
    pub async fn security_exceptions(&self, oid: &Oid) -> BackendResult<Vec<String>> {
        let params = [
            ("q", format!("(id:{oid} AND item_type:object)")),
            ("fl", "security_exception".to_string()),
            ("wt", "json".to_string()),
        ];
        let body = self.solr.get("select", Some(&params[..])).await?;
        let envelope: SearchEnvelope<SecurityDoc> = serde_json::from_value(body)
            .map_err(|e| BackendError::shape(format!("solr response: {e}")))?;

        if envelope.response.num_found == 0 {
            return Ok(Vec::new());
        }
        Ok(envelope
            .response
            .docs
            .into_iter()
            .next()
            .map(|doc| doc.security_exception)
            .unwrap_or_default())
    }

    fn unsupported(operation: &'static str) -> BackendError {
        BackendError::Unsupported {
            backend: NAME,
            operation,
        }
    }
}

#[async_trait]
impl RepositoryBackend for Redbox1 {
    fn version(&self) -> BackendVersion {
        BackendVersion::Redbox1
    }

    fn set_progress(&mut self, progress: Option<ProgressCallback>) {
        self.api.set_progress(progress);
    }

    async fn info(&self) -> BackendResult<Value> {
        self.api.get("/info", None).await
    }

    fn pages<'a>(&'a self, package_type: &'a str, start: u64) -> BoxStream<'a, BackendResult<Page>> {
        paginate(start, move |offset| self.fetch_page(package_type, offset))
    }

    async fn create_record(
        &self,
        metadata: &Value,
        package_type: &str,
        options: &CreateOptions,
    ) -> BackendResult<Oid> {
        let params = options.to_params();
        let body = self
            .api
            .post(&format!("/object/{package_type}"), metadata, Some(&params[..]))
            .await?;
        oid_from_response(&body)
    }

    async fn get_record(&self, oid: &Oid) -> BackendResult<Value> {
        self.api.get(&format!("recordmetadata/{oid}"), None).await
    }

    async fn get_record_metadata(&self, oid: &Oid) -> BackendResult<Value> {
        self.api.get(&format!("objectmetadata/{oid}"), None).await
    }

    async fn update_record_metadata(&self, oid: &Oid, metadata: &Value) -> BackendResult<Value> {
        self.api
            .post(&format!("objectmetadata/{oid}"), metadata, None)
            .await
    }

    async fn get_permissions(&self, oid: &Oid) -> BackendResult<PermissionSet> {
        let metadata = self.get_record_metadata(oid).await?;
        let mut perms = PermissionSet::default();

        if let Some(owner) = metadata.get("owner").and_then(Value::as_str).filter(|o| !o.is_empty()) {
            perms.view.push(owner.to_string());
            perms.edit.push(owner.to_string());
        }

        let viewers = self.security_exceptions(oid).await?;
        perms.union_view(viewers);
        Ok(perms)
    }

    async fn grant_permission(
        &self,
        _oid: &Oid,
        _kind: PermissionKind,
        _principals: &PrincipalDelta,
    ) -> BackendResult<PermissionSet> {
        Err(Self::unsupported("grantPermission"))
    }

    async fn remove_permission(
        &self,
        _oid: &Oid,
        _kind: PermissionKind,
        _principals: &PrincipalDelta,
    ) -> BackendResult<PermissionSet> {
        Err(Self::unsupported("removePermission"))
    }

    async fn write_datastream(&self, oid: &Oid, dsid: &str, data: Vec<u8>) -> BackendResult<Value> {
        let params = [("datastreamId", encode_value(dsid))];
        self.api
            .post_bytes(&format!("datastream/{oid}"), data, Some(&params[..]))
            .await
    }

    async fn read_datastream(&self, oid: &Oid, dsid: &str) -> BackendResult<Datastream> {
        let params = [("datastreamId", encode_value(dsid))];
        self.api
            .get_stream(&format!("datastream/{oid}"), Some(&params[..]))
            .await
    }

    async fn list_datastreams(&self, oid: &Oid) -> BackendResult<Value> {
        self.api.get(&format!("datastream/{oid}/list"), None).await
    }
}
