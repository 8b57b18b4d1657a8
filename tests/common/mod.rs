#![allow(dead_code)]

use redbox_api::{BackendVersion, ServerConfig};
use serde_json::{json, Value};
use std::ops::Range;
use wiremock::MockServer;

pub const API_KEY: &str = "test-api-key";
pub const V1_PREFIX: &str = "/redbox/api/v1";
pub const SOLR_PREFIX: &str = "/solr/fascinator";
pub const V2_PREFIX: &str = "/default/rdmp";

pub fn redbox1_server(mock: &MockServer) -> ServerConfig {
    ServerConfig {
        version: BackendVersion::Redbox1,
        base_url: format!("{}{}", mock.uri(), V1_PREFIX),
        api_key: Some(API_KEY.to_string()),
        solr_url: Some(format!("{}{}", mock.uri(), SOLR_PREFIX)),
        branding: None,
        portal: None,
        update_metadata_path: None,
    }
}

pub fn redbox2_server(mock: &MockServer) -> ServerConfig {
    ServerConfig {
        version: BackendVersion::Redbox2,
        base_url: mock.uri(),
        api_key: Some(API_KEY.to_string()),
        solr_url: None,
        branding: Some("default".to_string()),
        portal: Some("rdmp".to_string()),
        update_metadata_path: None,
    }
}

pub fn ids(range: Range<usize>) -> Vec<String> {
    range.map(|i| format!("oid{i:04}")).collect()
}

/// A ReDBox 1.9 `search` response page
pub fn search_page(range: Range<usize>, num_found: usize) -> Value {
    let docs: Vec<Value> = ids(range).into_iter().map(|id| json!({ "id": id })).collect();
    json!({
        "responseHeader": { "status": 0 },
        "response": { "numFound": num_found, "docs": docs }
    })
}

/// A ReDBox 2.0 `listRecords` response page
pub fn list_records_page(range: Range<usize>, num_found: usize) -> Value {
    let items: Vec<Value> = ids(range)
        .into_iter()
        .map(|id| json!({ "id": id, "title": format!("Record {id}") }))
        .collect();
    json!({ "response": { "numFound": num_found, "items": items } })
}

/// Permissions of a freshly created ReDBox 2.0 RDMP
pub fn rdmp_permissions() -> Value {
    json!({
        "viewRoles": ["Admin", "Librarians"],
        "editRoles": ["Admin", "Librarians"],
        "view": ["admin"],
        "edit": ["admin"]
    })
}
