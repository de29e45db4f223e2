use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Outcome of the most recent completed build, as shown by CCTray clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LastBuildStatus {
    Success,
    Failure,
    Unknown,
}

impl LastBuildStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LastBuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a build is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Activity {
    Sleeping,
    Building,
}

impl Activity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sleeping => "Sleeping",
            Self::Building => "Building",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of the status feed.
///
/// Depending on the configured granularity a project is either a whole
/// pipeline or one stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub last_build_status: LastBuildStatus,
    pub activity: Activity,
    #[serde(serialize_with = "serialize_build_time")]
    pub last_build_time: DateTime<Utc>,
}

impl Project {
    /// RFC 3339 with second precision and an explicit offset, e.g. `2024-01-01T00:00:00Z`.
    pub fn formatted_build_time(&self) -> String {
        format_build_time(&self.last_build_time)
    }
}

pub fn format_build_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn serialize_build_time<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_build_time(time))
}
