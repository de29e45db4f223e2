use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::{timeout_at, Instant};

use crate::aggregate::{aggregate, Granularity};
use crate::error::{CycleError, Result};
use crate::persist::PersistenceProvider;
use crate::snapshot::PipelineSnapshot;
use crate::source::PipelineStateSource;
use crate::status::Project;

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(25);
pub const DEFAULT_PERSIST_RESERVE: Duration = Duration::from_secs(5);

/// Step of a poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Fetching,
    Aggregating,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Fetching => "fetching pipeline state",
            Self::Aggregating => "aggregating projects",
            Self::Persisting => "persisting projects",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Outcome of a successful cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub projects: Vec<Project>,
    pub target: String,
    pub elapsed: Duration,
}

/// Runs fetch, aggregate and persist as one deadline-bounded cycle.
///
/// Nothing is retried. A failed cycle never starts a write, or only fails a
/// write that commits atomically, so the published feed is at worst stale.
pub struct Orchestrator {
    source: Arc<dyn PipelineStateSource>,
    sink: Arc<dyn PersistenceProvider>,
    granularity: Granularity,
    deadline: Duration,
    persist_reserve: Duration,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn PipelineStateSource>,
        sink: Arc<dyn PersistenceProvider>,
        granularity: Granularity,
    ) -> Self {
        Self {
            source,
            sink,
            granularity,
            deadline: DEFAULT_DEADLINE,
            persist_reserve: DEFAULT_PERSIST_RESERVE,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Minimum time that must remain before a persist is started.
    #[must_use]
    pub fn with_persist_reserve(mut self, reserve: Duration) -> Self {
        self.persist_reserve = reserve;
        self
    }

    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();
        let deadline = started + self.deadline;
        let mut cycle = Cycle::new(self.deadline);

        info!("Starting status cycle for {}", self.sink.target());

        let snapshots = match timeout_at(deadline, self.source.fetch_pipeline_states()).await {
            Ok(Ok(snapshots)) => snapshots,
            Ok(Err(e)) => return Err(cycle.fail(CycleError::Fetch(e))),
            Err(_) => return Err(cycle.deadline_elapsed()),
        };
        info!("Retrieved state for {} pipelines", snapshots.len());

        cycle.advance(CycleStage::Aggregating);
        if let Err(e) = check_preconditions(&snapshots) {
            return Err(cycle.fail(e));
        }
        let projects = aggregate(&snapshots, self.granularity);

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining < self.persist_reserve {
            warn!(
                "Only {remaining:?} left of the {:?} deadline, skipping persist",
                self.deadline
            );
            cycle.advance(CycleStage::Persisting);
            return Err(cycle.deadline_elapsed());
        }

        cycle.advance(CycleStage::Persisting);
        match timeout_at(deadline, self.sink.persist_projects(&projects)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(cycle.fail(CycleError::Persist(e))),
            Err(_) => return Err(cycle.deadline_elapsed()),
        }

        cycle.advance(CycleStage::Done);
        let elapsed = started.elapsed();
        info!(
            "Persisted {} projects to {} in {elapsed:?}",
            projects.len(),
            self.sink.target()
        );

        Ok(CycleReport {
            projects,
            target: self.sink.target(),
            elapsed,
        })
    }
}

/// Tracks the current stage so failures carry where they happened.
struct Cycle {
    stage: CycleStage,
    deadline: Duration,
}

impl Cycle {
    fn new(deadline: Duration) -> Self {
        debug!("Cycle stage: {}", CycleStage::Fetching);
        Self {
            stage: CycleStage::Fetching,
            deadline,
        }
    }

    fn advance(&mut self, next: CycleStage) {
        debug!("Cycle stage: {} -> {next}", self.stage);
        self.stage = next;
    }

    fn fail(&mut self, error: CycleError) -> CycleError {
        warn!("Cycle failed while {}: {error}", self.stage);
        self.stage = CycleStage::Failed;
        error
    }

    fn deadline_elapsed(&mut self) -> CycleError {
        let error = CycleError::DeadlineElapsed {
            stage: self.stage,
            deadline: self.deadline,
        };
        self.fail(error)
    }
}

/// Input the aggregator assumes but does not check.
fn check_preconditions(snapshots: &[PipelineSnapshot]) -> Result<()> {
    let mut seen = HashSet::with_capacity(snapshots.len());

    for (index, snapshot) in snapshots.iter().enumerate() {
        if snapshot.name.is_empty() {
            return Err(CycleError::Precondition(format!(
                "pipeline at position {index} has no name"
            )));
        }
        if !seen.insert(snapshot.name.as_str()) {
            return Err(CycleError::Precondition(format!(
                "pipeline name {:?} appears more than once",
                snapshot.name
            )));
        }
    }

    Ok(())
}
