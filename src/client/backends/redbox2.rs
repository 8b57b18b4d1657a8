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
use tracing::{info, warn};

const NAME: &str = "Redbox2";

/// Rows requested per `listRecords` page
pub const PAGE_SIZE: u64 = 10;

/// Metadata update path used when the server entry does not override it.
///
/// Unlike every other record endpoint this one has no `api/` prefix. It has
/// not been confirmed against a live portal, hence the override.
pub const DEFAULT_UPDATE_METADATA_PATH: &str = "records/metadata/{oid}";

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    response: ListResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    num_found: u64,
    items: Vec<ListItem>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    id: String,
}

/// Client for the ReDBox 2.0 portal API.
///
/// Requests are routed through `<base_url>/<branding>/<portal>`. The listing
/// endpoint is not under `api/`, so the routing prefix is the base and each
/// path carries its own `api/` segment.
#[derive(Debug)]
pub struct Redbox2 {
    api: RequestBase,
    update_metadata_path: String,
}

impl Redbox2 {
    pub fn new(server: &ServerConfig, http: &HttpClientConfig) -> Result<Self> {
        let branding = ServerConfig::require(server.branding.as_ref(), "branding", BackendVersion::Redbox2)?;
        let portal = ServerConfig::require(server.portal.as_ref(), "portal", BackendVersion::Redbox2)?;

        let base_url = format!(
            "{}/{}/{}",
            server.base_url.trim_end_matches('/'),
            branding,
            portal
        );
        let api = RequestBase::new(&base_url, server.api_key.as_deref(), http)?;

        let update_metadata_path = match &server.update_metadata_path {
            Some(path) => path.clone(),
            None => {
                warn!(
                    "Using unverified metadata update path '{}' for {}",
                    DEFAULT_UPDATE_METADATA_PATH, base_url
                );
                DEFAULT_UPDATE_METADATA_PATH.to_string()
            }
        };

        info!("Initialized {} client at {}", NAME, api.base_url());
        Ok(Self {
            api,
            update_metadata_path,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }

    async fn fetch_page(&self, package_type: &str, start: u64) -> BackendResult<Page> {
        self.api
            .report_progress(&format!("Searching for {package_type}: {start}"));

        let params = [
            ("recordType", package_type.to_string()),
            ("start", start.to_string()),
            ("rows", PAGE_SIZE.to_string()),
        ];
        let body = self.api.get("listRecords", Some(&params[..])).await?;
        let envelope: ListEnvelope = serde_json::from_value(body)
            .map_err(|e| BackendError::shape(format!("listRecords response: {e}")))?;

        let ids = envelope
            .response
            .items
            .into_iter()
            .map(|item| Oid::new(&item.id))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| BackendError::shape(format!("listRecords response: {e}")))?;

        Ok(Page {
            start,
            num_found: envelope.response.num_found,
            ids,
        })
    }

    fn permissions_path(kind: PermissionKind, oid: &Oid) -> String {
        format!("api/records/permissions/{kind}/{oid}")
    }

    fn unsupported(operation: &'static str, hint: &str) -> BackendError {
        warn!("{} not available on {}{}", operation, NAME, hint);
        BackendError::Unsupported {
            backend: NAME,
            operation,
        }
    }
}

fn parse_permissions(body: Value) -> BackendResult<PermissionSet> {
    serde_json::from_value(body).map_err(|e| BackendError::shape(format!("permissions response: {e}")))
}

#[async_trait]
impl RepositoryBackend for Redbox2 {
    fn version(&self) -> BackendVersion {
        BackendVersion::Redbox2
    }

    fn set_progress(&mut self, progress: Option<ProgressCallback>) {
        self.api.set_progress(progress);
    }

    async fn info(&self) -> BackendResult<Value> {
        Ok(Value::Object(serde_json::Map::new()))
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
            .post(
                &format!("api/records/metadata/{package_type}"),
                metadata,
                Some(&params[..]),
            )
            .await?;
        oid_from_response(&body)
    }

    async fn get_record(&self, oid: &Oid) -> BackendResult<Value> {
        self.api
            .get(&format!("api/records/metadata/{oid}"), None)
            .await
    }

    async fn get_record_metadata(&self, oid: &Oid) -> BackendResult<Value> {
        self.api.get(&format!("api/objectmetadata/{oid}"), None).await
    }

    async fn update_record_metadata(&self, oid: &Oid, metadata: &Value) -> BackendResult<Value> {
        let path = self.update_metadata_path.replace("{oid}", oid.as_str());
        self.api.post(&path, metadata, None).await
    }

    async fn get_permissions(&self, oid: &Oid) -> BackendResult<PermissionSet> {
        let body = self
            .api
            .get(&format!("api/records/permissions/{oid}"), None)
            .await?;
        parse_permissions(body)
    }

    async fn grant_permission(
        &self,
        oid: &Oid,
        kind: PermissionKind,
        principals: &PrincipalDelta,
    ) -> BackendResult<PermissionSet> {
        let payload = serde_json::to_value(principals)
            .map_err(|e| BackendError::shape(format!("principals: {e}")))?;
        let body = self
            .api
            .post(&Self::permissions_path(kind, oid), &payload, None)
            .await?;
        parse_permissions(body)
    }

    async fn remove_permission(
        &self,
        oid: &Oid,
        kind: PermissionKind,
        principals: &PrincipalDelta,
    ) -> BackendResult<PermissionSet> {
        let payload = serde_json::to_value(principals)
            .map_err(|e| BackendError::shape(format!("principals: {e}")))?;
        let body = self
            .api
            .delete(&Self::permissions_path(kind, oid), Some(&payload))
            .await?;
        parse_permissions(body)
    }

    async fn write_datastream(&self, _oid: &Oid, _dsid: &str, _data: Vec<u8>) -> BackendResult<Value> {
        Err(Self::unsupported("writeDatastream", ""))
    }

    async fn read_datastream(&self, oid: &Oid, dsid: &str) -> BackendResult<Datastream> {
        let params = [("datastreamId", encode_value(dsid))];
        self.api
            .get_stream(&format!("api/records/datastreams/{oid}"), Some(&params[..]))
            .await
    }

    async fn list_datastreams(&self, _oid: &Oid) -> BackendResult<Value> {
        Err(Self::unsupported(
            "listDatastreams",
            " - use the record metadata",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn server() -> ServerConfig {
        ServerConfig {
            version: BackendVersion::Redbox2,
            base_url: "http://localhost:1500/".to_string(),
            api_key: Some("key".to_string()),
            solr_url: None,
            branding: Some("default".to_string()),
            portal: Some("rdmp".to_string()),
            update_metadata_path: None,
        }
    }

    #[test]
    fn test_routing_prefix_in_base_url() {
        let rb = Redbox2::new(&server(), &HttpClientConfig::default()).unwrap();
        assert_eq!(rb.base_url(), "http://localhost:1500/default/rdmp");
    }

    #[test]
    fn test_permissions_path() {
        let oid = Oid::new("abc").unwrap();
        assert_eq!(
            Redbox2::permissions_path(PermissionKind::Edit, &oid),
            "api/records/permissions/edit/abc"
        );
    }

    #[test]
    fn test_parse_list_envelope() {
        let envelope: ListEnvelope = serde_json::from_value(json!({
            "response": { "numFound": 3, "items": [ { "id": "x", "title": "t" } ] }
        }))
        .unwrap();
        assert_eq!(envelope.response.num_found, 3);
        assert_eq!(envelope.response.items[0].id, "x");
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let rb = Redbox2::new(&server(), &HttpClientConfig::default()).unwrap();
        let oid = Oid::new("abc").unwrap();

        assert!(matches!(
            rb.write_datastream(&oid, "a.txt", b"data".to_vec()).await,
            Err(BackendError::Unsupported { operation: "writeDatastream", .. })
        ));
        assert!(matches!(
            rb.list_datastreams(&oid).await,
            Err(BackendError::Unsupported { operation: "listDatastreams", .. })
        ));
        assert_eq!(rb.info().await.unwrap(), json!({}));
    }
}
