use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::snapshot::{PipelineSnapshot, StageExecutionStatus, StageSnapshot};
use crate::status::{Activity, LastBuildStatus, Project};

/// How many feed entries a pipeline produces.
///
/// Dashboards are configured against project names, so a deployment must stick
/// to one mode: switching renames every entry in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// One project per pipeline, reduced over all of its stages
    #[default]
    Pipeline,
    /// One project per pipeline stage, named `<pipeline> :: <stage>`
    Stage,
}

/// Reduces pipeline snapshots into feed projects.
///
/// Projects are emitted in input order (and stage order in `Stage` mode), so a
/// fixed input always yields the same feed.
pub fn aggregate(snapshots: &[PipelineSnapshot], granularity: Granularity) -> Vec<Project> {
    let projects: Vec<Project> = match granularity {
        Granularity::Pipeline => snapshots.iter().map(pipeline_project).collect(),
        Granularity::Stage => snapshots.iter().flat_map(stage_projects).collect(),
    };

    debug!(
        "Aggregated {} pipelines into {} projects ({granularity:?} granularity)",
        snapshots.len(),
        projects.len()
    );

    projects
}

// Any failed stage fails the pipeline; everything else, Unknown stages
// included, reports Success. In-flight executions therefore hide a previous
// failure until the stage finishes.
fn pipeline_project(pipeline: &PipelineSnapshot) -> Project {
    let mut last_build_status = LastBuildStatus::Success;
    let mut activity = Activity::Sleeping;
    let mut last_build_time = pipeline.created_at;

    for stage in &pipeline.stages {
        if stage_status(stage) == LastBuildStatus::Failure {
            last_build_status = LastBuildStatus::Failure;
        }

        if stage_activity(stage) == Activity::Building {
            activity = Activity::Building;
        }

        let stage_time = stage_time(pipeline.created_at, stage);
        if stage_time > last_build_time {
            last_build_time = stage_time;
        }
    }

    Project {
        name: pipeline.name.clone(),
        last_build_status,
        activity,
        last_build_time,
    }
}

fn stage_projects(pipeline: &PipelineSnapshot) -> impl Iterator<Item = Project> + '_ {
    pipeline.stages.iter().map(|stage| Project {
        name: stage_project_name(&pipeline.name, &stage.stage_name),
        last_build_status: stage_status(stage),
        activity: stage_activity(stage),
        last_build_time: stage_time(pipeline.created_at, stage),
    })
}

pub fn stage_project_name(pipeline_name: &str, stage_name: &str) -> String {
    format!("{pipeline_name} :: {stage_name}")
}

pub fn stage_status(stage: &StageSnapshot) -> LastBuildStatus {
    match &stage.latest_execution_status {
        None => LastBuildStatus::Unknown,
        Some(StageExecutionStatus::Failed) => LastBuildStatus::Failure,
        Some(StageExecutionStatus::Succeeded) => LastBuildStatus::Success,
        // The previous terminal outcome is not available mid-flight, so assume
        // success rather than report a transient status.
        Some(_) => LastBuildStatus::Success,
    }
}

pub fn stage_activity(stage: &StageSnapshot) -> Activity {
    match stage.latest_execution_status {
        Some(StageExecutionStatus::InProgress) => Activity::Building,
        _ => Activity::Sleeping,
    }
}

/// Only the first action is consulted; the source order is authoritative.
pub fn stage_time(created_at: DateTime<Utc>, stage: &StageSnapshot) -> DateTime<Utc> {
    stage
        .actions
        .first()
        .and_then(|action| action.last_status_change)
        .unwrap_or(created_at)
}
