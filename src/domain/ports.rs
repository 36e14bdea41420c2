use crate::domain::model::Profile;
use crate::utils::error::{Result, RetrieveError};
use async_trait::async_trait;

/// Render format requested from the record source target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Json,
    Xml,
    Raw,
}

/// Fetches a bibliographic record from a remote target (Z39.50 or similar)
/// by external identifier (ISBN, OCLC number, ...).
///
/// The underlying protocol client is blocking; implementations must run it on
/// a blocking worker (e.g. `tokio::task::spawn_blocking`) so it cannot stall
/// the scheduler driving the import workflow.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(
        &self,
        profile: &Profile,
        external_id: &str,
        format: RenderFormat,
    ) -> std::result::Result<Vec<u8>, RetrieveError>;
}

/// Resolves a profile id to its stored configuration.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile(&self, id: &str) -> Result<Option<Profile>>;
}
