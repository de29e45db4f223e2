use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of one pipeline as observed by the state source during a poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    /// Pipeline name, unique within a feed
    pub name: String,
    /// Pipeline creation time, the fallback build time
    pub created_at: DateTime<Utc>,
    /// Region the pipeline lives in, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Stages in the order returned by the source
    #[serde(default)]
    pub stages: Vec<StageSnapshot>,
}

/// State of one stage within a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSnapshot {
    pub stage_name: String,
    /// `None` when the stage has never executed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_execution_status: Option<StageExecutionStatus>,
    #[serde(default)]
    pub actions: Vec<ActionSnapshot>,
}

/// State of one action within a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status_change: Option<DateTime<Utc>>,
}

/// Status of the latest execution of a stage.
///
/// The set of values is owned by the pipeline service, so anything not listed
/// here is kept verbatim in `Other` instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StageExecutionStatus {
    Cancelled,
    InProgress,
    Failed,
    Stopped,
    Stopping,
    Succeeded,
    Other(String),
}

impl From<String> for StageExecutionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Cancelled" => Self::Cancelled,
            "InProgress" => Self::InProgress,
            "Failed" => Self::Failed,
            "Stopped" => Self::Stopped,
            "Stopping" => Self::Stopping,
            "Succeeded" => Self::Succeeded,
            _ => Self::Other(value),
        }
    }
}

impl From<StageExecutionStatus> for String {
    fn from(value: StageExecutionStatus) -> Self {
        match value {
            StageExecutionStatus::Cancelled => "Cancelled".to_string(),
            StageExecutionStatus::InProgress => "InProgress".to_string(),
            StageExecutionStatus::Failed => "Failed".to_string(),
            StageExecutionStatus::Stopped => "Stopped".to_string(),
            StageExecutionStatus::Stopping => "Stopping".to_string(),
            StageExecutionStatus::Succeeded => "Succeeded".to_string(),
            StageExecutionStatus::Other(other) => other,
        }
    }
}
