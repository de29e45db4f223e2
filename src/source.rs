use std::path::PathBuf;

use async_trait::async_trait;
use log::{debug, warn};

use crate::error::FetchError;
use crate::snapshot::PipelineSnapshot;

/// Supplies the current state of every pipeline.
#[async_trait]
pub trait PipelineStateSource: Send + Sync {
    async fn fetch_pipeline_states(&self) -> Result<Vec<PipelineSnapshot>, FetchError>;
}

/// Reads snapshots from a JSON document written by an external collector.
///
/// The file holds an array of pipeline snapshots; it is re-read on every
/// cycle so the collector can replace it between polls.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PipelineStateSource for JsonFileSource {
    async fn fetch_pipeline_states(&self) -> Result<Vec<PipelineSnapshot>, FetchError> {
        let contents = tokio::fs::read(&self.path)
            .await
            .map_err(|source| FetchError::Read {
                path: self.path.clone(),
                source,
            })?;

        let snapshots: Vec<PipelineSnapshot> =
            serde_json::from_slice(&contents).map_err(|source| FetchError::Parse {
                path: self.path.clone(),
                source,
            })?;

        if snapshots.is_empty() {
            warn!("No pipelines found in {}", self.path.display());
        }
        debug!(
            "Loaded {} pipeline snapshots from {}",
            snapshots.len(),
            self.path.display()
        );

        Ok(snapshots)
    }
}
