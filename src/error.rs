use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::orchestrator::CycleStage;

/// The state source could not provide pipeline state.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("unable to read pipeline state from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse pipeline state from {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("XML encoding error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a persistence attempt failed, without the destination.
#[derive(Error, Debug)]
pub enum PersistFailure {
    #[error("feed encoding failed: {0}")]
    Encode(#[from] FeedError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid object address: {0}")]
    InvalidAddress(String),

    #[error("object store rejected upload (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A failed attempt to publish the feed to `target`.
#[derive(Error, Debug)]
#[error("unable to persist to {target}: {failure}")]
pub struct PersistError {
    pub target: String,
    #[source]
    pub failure: PersistFailure,
}

impl PersistError {
    pub fn new(target: impl Into<String>, failure: impl Into<PersistFailure>) -> Self {
        Self {
            target: target.into(),
            failure: failure.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// A poll cycle that stopped before the feed was published.
///
/// The previously published feed is left untouched in every case.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("unable to get pipeline state: {0}")]
    Fetch(#[source] FetchError),

    #[error("malformed pipeline state: {0}")]
    Precondition(String),

    #[error("cycle deadline of {deadline:?} elapsed while {stage}")]
    DeadlineElapsed {
        stage: CycleStage,
        deadline: Duration,
    },

    #[error("unable to persist projects data: {0}")]
    Persist(#[source] PersistError),
}

pub type Result<T> = std::result::Result<T, CycleError>;
