//! Job boundary - create, poll and cancel pipeline runs.
//!
//! Each job runs on its own tokio task. Snapshots are plain serializable
//! values so a caller can persist them elsewhere. Only the newest finished
//! jobs are retained; older ones are evicted as new jobs arrive.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::generation::{PanelResult, PanelStatus, ProgressSink};
use crate::panels::PanelType;
use crate::pipeline::{PipelineError, PipelineRequest, PresentationPipeline, RunReport};
use crate::sheet::Sheet;

pub type JobId = Uuid;

/// Finished jobs kept by [`JobManager::new`].
pub const DEFAULT_RETAINED_JOBS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelProgress {
    pub panel: PanelType,
    pub state: PanelState,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub message: String,
    /// Gate or schema rejection rather than an operational failure.
    pub validation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub panels: Vec<PanelProgress>,
    pub result: Option<RunReport>,
    pub error: Option<JobFailure>,
}

impl JobSnapshot {
    fn queued(id: JobId) -> Self {
        let now = Utc::now();
        Self { id, status: JobStatus::Queued, created_at: now, updated_at: now, panels: vec![], result: None, error: None }
    }

    fn panel_mut(&mut self, panel: PanelType) -> &mut PanelProgress {
        let index = match self.panels.iter().position(|p| p.panel == panel) {
            Some(i) => i,
            None => {
                self.panels.push(PanelProgress { panel, state: PanelState::Pending, attempts: 0 });
                self.panels.len() - 1
            }
        };
        &mut self.panels[index]
    }
}

struct JobRecord {
    snapshot: Mutex<JobSnapshot>,
    sheet: Mutex<Option<Arc<Sheet>>>,
    cancel: watch::Sender<bool>,
    finished: watch::Sender<bool>,
}

impl JobRecord {
    fn update(&self, edit: impl FnOnce(&mut JobSnapshot)) {
        let mut snapshot = self.snapshot.lock();
        edit(&mut snapshot);
        snapshot.updated_at = Utc::now();
    }
}

impl ProgressSink for JobRecord {
    fn panel_started(&self, panel: PanelType, attempt: u32) {
        self.update(|s| {
            let entry = s.panel_mut(panel);
            entry.state = PanelState::Running;
            entry.attempts = attempt;
        });
    }

    fn panel_finished(&self, result: &PanelResult) {
        self.update(|s| {
            let entry = s.panel_mut(result.panel);
            entry.attempts = result.attempts;
            entry.state = match result.status {
                PanelStatus::Succeeded => PanelState::Succeeded,
                PanelStatus::Failed => PanelState::Failed,
                PanelStatus::Cancelled => PanelState::Cancelled,
            };
        });
    }
}

/// Registry of running and finished jobs over one shared pipeline.
#[derive(Clone)]
pub struct JobManager {
    pipeline: Arc<PresentationPipeline>,
    jobs: Arc<DashMap<JobId, Arc<JobRecord>>>,
    retained: usize,
}

impl JobManager {
    pub fn new(pipeline: Arc<PresentationPipeline>) -> Self {
        Self::with_retention(pipeline, DEFAULT_RETAINED_JOBS)
    }

    /// Keep at most `retained` finished jobs; running jobs are never evicted.
    pub fn with_retention(pipeline: Arc<PresentationPipeline>, retained: usize) -> Self {
        Self { pipeline, jobs: Arc::new(DashMap::new()), retained }
    }

    /// Queue a run for `raw` input. Must be called inside a tokio runtime.
    pub fn create_job(&self, raw: Value) -> JobId {
        self.create_job_with(PipelineRequest::new(raw))
    }

    pub fn create_job_with(&self, request: PipelineRequest) -> JobId {
        let id = Uuid::new_v4();
        let (cancel, cancel_rx) = watch::channel(false);
        let (finished, _) = watch::channel(false);
        let record = Arc::new(JobRecord {
            snapshot: Mutex::new(JobSnapshot::queued(id)),
            sheet: Mutex::new(None),
            cancel,
            finished,
        });
        self.evict_finished();
        self.jobs.insert(id, Arc::clone(&record));
        info!(job_id = %id, "job queued");

        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            let run = tokio::spawn(execute(pipeline, id, request, Arc::clone(&record), cancel_rx));
            if let Err(e) = run.await {
                warn!(job_id = %id, error = %e, "job task aborted");
                let failure = JobFailure { message: format!("job task aborted: {}", e), validation: false };
                record.update(|s| {
                    s.status = JobStatus::Failed;
                    s.error = Some(failure);
                });
            }
            record.finished.send_replace(true);
        });
        id
    }

    /// Drop a finished job. Running jobs are left alone and return `None`.
    pub fn remove(&self, id: JobId) -> Option<JobSnapshot> {
        let (_, record) = self.jobs.remove_if(&id, |_, r| r.snapshot.lock().status.is_terminal())?;
        let snapshot = record.snapshot.lock().clone();
        Some(snapshot)
    }

    fn evict_finished(&self) {
        let mut finished: Vec<(DateTime<Utc>, JobId)> = self
            .jobs
            .iter()
            .filter_map(|r| {
                let s = r.snapshot.lock();
                s.status.is_terminal().then_some((s.updated_at, s.id))
            })
            .collect();
        if finished.len() <= self.retained {
            return;
        }
        finished.sort();
        let excess = finished.len() - self.retained;
        for (_, id) in finished.into_iter().take(excess) {
            self.jobs.remove(&id);
        }
    }

    pub fn get_job(&self, id: JobId) -> Option<JobSnapshot> {
        self.jobs.get(&id).map(|r| r.snapshot.lock().clone())
    }

    /// Composed sheet of a succeeded job.
    pub fn sheet(&self, id: JobId) -> Option<Arc<Sheet>> {
        self.jobs.get(&id).and_then(|r| r.sheet.lock().clone())
    }

    /// Request cancellation. Returns false for unknown or finished jobs.
    pub fn cancel_job(&self, id: JobId) -> bool {
        let Some(record) = self.jobs.get(&id).map(|r| Arc::clone(r.value())) else {
            return false;
        };
        if record.snapshot.lock().status.is_terminal() {
            return false;
        }
        info!(job_id = %id, "cancellation requested");
        record.cancel.send_replace(true);
        true
    }

    /// Wait until the job reaches a terminal status.
    pub async fn wait(&self, id: JobId) -> Option<JobSnapshot> {
        let record = self.jobs.get(&id).map(|r| Arc::clone(r.value()))?;
        let mut finished = record.finished.subscribe();
        // Sender lives in the record, so the channel cannot close here.
        let _ = finished.wait_for(|done| *done).await;
        let snapshot = record.snapshot.lock().clone();
        Some(snapshot)
    }

    pub fn list(&self) -> Vec<JobSnapshot> {
        let mut all: Vec<JobSnapshot> = self.jobs.iter().map(|r| r.snapshot.lock().clone()).collect();
        all.sort_by_key(|s| s.created_at);
        all
    }
}

async fn execute(
    pipeline: Arc<PresentationPipeline>,
    id: JobId,
    request: PipelineRequest,
    record: Arc<JobRecord>,
    cancel: watch::Receiver<bool>,
) {
    let outcome = match pipeline.prepare(&request) {
        Ok(prepared) => {
            record.update(|s| {
                s.status = JobStatus::Running;
                s.panels = prepared
                    .jobs
                    .iter()
                    .map(|j| PanelProgress { panel: j.panel, state: PanelState::Pending, attempts: 0 })
                    .collect();
            });
            pipeline.run_prepared(&prepared, request.overlay.as_ref(), cancel, record.as_ref()).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(run) => {
            info!(job_id = %id, run_hash = %run.report.run_hash, "job succeeded");
            *record.sheet.lock() = Some(Arc::new(run.sheet));
            record.update(|s| {
                s.status = JobStatus::Succeeded;
                s.result = Some(run.report);
            });
        }
        Err(PipelineError::Cancelled { completed }) => {
            info!(job_id = %id, completed, "job cancelled");
            record.update(|s| s.status = JobStatus::Cancelled);
        }
        Err(e) => {
            warn!(job_id = %id, error = %e, "job failed");
            let failure = JobFailure { message: e.to_string(), validation: e.is_validation_failure() };
            record.update(|s| {
                s.status = JobStatus::Failed;
                s.error = Some(failure);
            });
        }
    }
}
