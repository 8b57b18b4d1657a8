pub mod redbox1;
pub mod redbox2;
pub mod traits;

pub use redbox1::Redbox1;
pub use redbox2::Redbox2;
pub use traits::{
    BackendError, BackendResult, BackendVersion, CreateOptions, FailureKind, RepositoryBackend,
};

use crate::client::{HttpClientConfig, Oid};
use crate::config::ServerConfig;
use crate::Result;
use serde_json::Value;
use tracing::{info, warn};

/// Build the backend named by the server's `version` tag.
///
/// The configuration is checked for everything the chosen backend needs, so
/// a bad server entry fails here rather than on the first request.
pub fn connect(server: &ServerConfig, http: &HttpClientConfig) -> Result<Box<dyn RepositoryBackend>> {
    let version = server.version;
    info!("Connecting to {} at {}", version, server.base_url);

    let backend: Box<dyn RepositoryBackend> = match version {
        BackendVersion::Redbox1 => Box::new(Redbox1::new(server, http)?),
        BackendVersion::Redbox2 => Box::new(Redbox2::new(server, http)?),
    };
    Ok(backend)
}

/// Pull the assigned oid out of a create response
pub(crate) fn oid_from_response(body: &Value) -> BackendResult<Oid> {
    let Some(oid) = body.get("oid") else {
        warn!("Create response has no oid: {}", body);
        return Err(BackendError::shape("create response has no oid"));
    };
    let oid = oid
        .as_str()
        .ok_or_else(|| BackendError::shape(format!("oid is not a string: {oid}")))?;
    Oid::new(oid).map_err(|e| BackendError::shape(e.to_string()))
}
