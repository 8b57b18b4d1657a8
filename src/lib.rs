//! Uniform client for the ReDBox 1.9 and ReDBox 2.0 repository APIs.
//!
//! ```no_run
//! use redbox_api::{connect, Config, Lenient};
//!
//! # async fn run() -> redbox_api::Result<()> {
//! let config = Config::load(None)?;
//! let backend = connect(config.server("Test2_0")?, &config.http)?;
//! let oids = backend.list("rdmp", 0).await?;
//!
//! // or, for callers that only need present / absent
//! let lenient = Lenient::new(backend);
//! let perms = lenient.get_permissions(&oids[0]).await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{
    connect, BackendError, BackendResult, BackendVersion, CreateOptions, Datastream, FailureKind,
    HttpClientConfig, Lenient, Oid, Page, PermissionKind, PermissionSet, Present,
    PrincipalDelta, ProgressCallback, RepositoryBackend,
};
pub use config::{Config, ServerConfig};
pub use error::{Error, ErrorCategory, Result};
