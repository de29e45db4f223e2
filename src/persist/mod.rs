mod file;
mod object_store;

pub use file::FileProvider;
pub use object_store::{HttpObjectStore, ObjectAcl, ObjectStoreProvider};

use async_trait::async_trait;

use crate::error::PersistError;
use crate::status::Project;

/// Publishes the encoded feed to its destination.
///
/// Implementations commit the complete document in one atomic step: readers
/// see either the previous feed or the new one, never a partial write. When
/// several cycles overlap, the last one to finish wins.
#[async_trait]
pub trait PersistenceProvider: Send + Sync {
    async fn persist_projects(&self, projects: &[Project]) -> Result<(), PersistError>;

    /// Human-readable destination, used in logs and errors.
    fn target(&self) -> String;
}
