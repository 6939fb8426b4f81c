//! Strictly sequential panel orchestration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::prompt::PanelJob;
use super::retry::{RetryDecision, RetryPolicy, RetryState};
use super::schedule::DelayTable;
use super::service::{ErrorClass, ImageService, ServiceError};
use super::ImageRef;
use crate::config::GenerationConfig;
use crate::panels::{PanelCategory, PanelType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelStatus {
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelFailure {
    pub class: Option<ErrorClass>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelResult {
    pub panel: PanelType,
    pub status: PanelStatus,
    pub image: Option<ImageRef>,
    pub seed: u32,
    pub geometry_hash: Option<String>,
    pub spec_hash: Option<String>,
    pub error: Option<PanelFailure>,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PanelResult {
    pub fn is_success(&self) -> bool {
        self.status == PanelStatus::Succeeded
    }

    /// A successful result carrying `image` and the run's identity hashes.
    pub fn succeeded(panel: PanelType, seed: u32, image: ImageRef, identity: &RunIdentity) -> Self {
        let now = Utc::now();
        Self {
            panel,
            status: PanelStatus::Succeeded,
            image: Some(image),
            seed,
            geometry_hash: Some(identity.geometry_hash.clone()),
            spec_hash: Some(identity.spec_hash.clone()),
            error: None,
            attempts: 1,
            started_at: now,
            finished_at: now,
        }
    }

    fn unfinished(panel: PanelType, seed: u32, status: PanelStatus, error: PanelFailure, attempts: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            panel,
            status,
            image: None,
            seed,
            geometry_hash: None,
            spec_hash: None,
            error: Some(error),
            attempts,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Hashes threaded into every successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    pub spec_hash: String,
    pub geometry_hash: String,
}

/// Append-only record of one run's panel results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelLedger {
    results: Vec<PanelResult>,
}

impl PanelLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, result: PanelResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[PanelResult] {
        &self.results
    }

    pub fn get(&self, panel: PanelType) -> Option<&PanelResult> {
        self.results.iter().rev().find(|r| r.panel == panel)
    }

    pub fn successful(&self) -> impl Iterator<Item = &PanelResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failed_panels(&self) -> Vec<PanelType> {
        self.results.iter().filter(|r| !r.is_success()).map(|r| r.panel).collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl FromIterator<PanelResult> for PanelLedger {
    fn from_iter<I: IntoIterator<Item = PanelResult>>(iter: I) -> Self {
        Self { results: iter.into_iter().collect() }
    }
}

pub trait ProgressSink: Send + Sync {
    fn panel_started(&self, _panel: PanelType, _attempt: u32) {}
    fn panel_finished(&self, _result: &PanelResult) {}
}

pub struct NoProgress;

impl ProgressSink for NoProgress {}

pub struct Orchestrator {
    service: Arc<dyn ImageService>,
    delays: DelayTable,
    policy: RetryPolicy,
    request_timeout: Duration,
}

impl Orchestrator {
    pub fn new(service: Arc<dyn ImageService>, config: &GenerationConfig) -> Self {
        Self {
            service,
            delays: DelayTable::from(config),
            policy: RetryPolicy::from(config),
            request_timeout: config.request_timeout(),
        }
    }

    /// Run `jobs` in order, one call in flight.
    ///
    /// Setting the cancel flag stops further submissions and interrupts
    /// waits. A call already in flight completes and is recorded; every
    /// panel not yet attempted is recorded as cancelled.
    pub async fn run(
        &self,
        identity: &RunIdentity,
        jobs: &[PanelJob],
        mut cancel: watch::Receiver<bool>,
        progress: &dyn ProgressSink,
    ) -> PanelLedger {
        let mut ledger = PanelLedger::new();
        let mut previous: Option<PanelCategory> = None;
        let mut cancelled = false;

        for job in jobs {
            let started_at = Utc::now();
            if !cancelled {
                let delay = self.delays.between(previous, job.category());
                cancelled = wait_or_cancel(delay, &mut cancel).await;
            }
            if cancelled {
                let result = PanelResult::unfinished(job.panel, job.seed, PanelStatus::Cancelled, cancelled_failure(), 0, started_at);
                progress.panel_finished(&result);
                ledger.append(result);
                continue;
            }

            let (result, interrupted) = self.run_panel(identity, job, &mut cancel, progress, started_at).await;
            cancelled = interrupted;
            previous = Some(job.category());
            progress.panel_finished(&result);
            ledger.append(result);
        }

        info!(
            spec_hash = %identity.spec_hash,
            succeeded = ledger.successful().count(),
            failed = ledger.failed_panels().len(),
            "panel generation finished"
        );
        ledger
    }

    async fn run_panel(
        &self,
        identity: &RunIdentity,
        job: &PanelJob,
        cancel: &mut watch::Receiver<bool>,
        progress: &dyn ProgressSink,
        started_at: DateTime<Utc>,
    ) -> (PanelResult, bool) {
        let mut retry = RetryState::new(self.policy);
        let mut attempts = 0;

        loop {
            attempts += 1;
            progress.panel_started(job.panel, attempts);
            debug!(panel = %job.panel, seed = job.seed, attempt = attempts, "submitting panel");

            let outcome = match tokio::time::timeout(self.request_timeout, self.service.generate(job.request())).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ServiceError::Timeout),
            };

            let error = match outcome {
                Ok(generated) => {
                    let mut result = PanelResult::succeeded(job.panel, job.seed, generated.image, identity);
                    result.attempts = attempts;
                    result.started_at = started_at;
                    info!(panel = %job.panel, seed = job.seed, attempts, "panel generated");
                    return (result, *cancel.borrow());
                }
                Err(e) => e,
            };

            match retry.on_error(&error) {
                RetryDecision::Retry { after, class } => {
                    warn!(panel = %job.panel, error = %error, class = ?class, wait_ms = after.as_millis() as u64, "retrying panel");
                    if wait_or_cancel(after, cancel).await {
                        let result = PanelResult::unfinished(job.panel, job.seed, PanelStatus::Cancelled, cancelled_failure(), attempts, started_at);
                        return (result, true);
                    }
                }
                RetryDecision::Fail { class, reason } => {
                    warn!(panel = %job.panel, error = %reason, class = ?class, "panel failed");
                    let failure = PanelFailure { class: Some(class), message: reason };
                    let result = PanelResult::unfinished(job.panel, job.seed, PanelStatus::Failed, failure, attempts, started_at);
                    return (result, *cancel.borrow());
                }
            }
        }
    }
}

fn cancelled_failure() -> PanelFailure {
    PanelFailure { class: None, message: "cancelled".to_string() }
}

/// Sleep for `delay` unless cancellation arrives first. Returns whether the
/// run is cancelled.
async fn wait_or_cancel(delay: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    if *cancel.borrow() {
        return true;
    }
    if delay.is_zero() {
        return false;
    }
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return *cancel.borrow(),
            changed = cancel.changed() => match changed {
                Ok(()) if *cancel.borrow() => return true,
                Ok(()) => continue,
                Err(_) => {
                    // Sender gone: nobody can cancel any more.
                    (&mut sleep).await;
                    return false;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GeneratedImage, GenerationRequest};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    /// Replays scripted outcomes and records call instants.
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<(), ServiceError>>>,
        calls: Mutex<Vec<(PanelType, Instant)>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<(), ServiceError>>) -> Arc<Self> {
            Arc::new(Self { outcomes: Mutex::new(outcomes.into()), calls: Mutex::new(vec![]) })
        }
    }

    #[async_trait]
    impl ImageService for Scripted {
        async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage, ServiceError> {
            self.calls.lock().push((request.panel, Instant::now()));
            let next = self.outcomes.lock().pop_front().unwrap_or(Ok(()));
            next.map(|()| GeneratedImage { image: ImageRef::inline(vec![request.seed as u8]) })
        }
    }

    fn job(panel: PanelType, seed: u32) -> PanelJob {
        PanelJob {
            panel,
            prompt: panel.title().to_string(),
            negative_prompt: String::new(),
            seed,
            control_image: None,
            init_strength: None,
            width: 64,
            height: 64,
            steps: 1,
            guidance: 1.0,
        }
    }

    fn identity() -> RunIdentity {
        RunIdentity { spec_hash: "spec0000spec0000".into(), geometry_hash: "geom0000geom0000".into() }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_follow_category_transitions() {
        let service = Scripted::new(vec![]);
        let orchestrator = Orchestrator::new(service.clone(), &GenerationConfig::default());
        let jobs = [
            job(PanelType::ElevationNorth, 1),
            job(PanelType::ElevationSouth, 2),
            job(PanelType::Hero3d, 3),
        ];
        let (_tx, rx) = watch::channel(false);
        let ledger = orchestrator.run(&identity(), &jobs, rx, &NoProgress).await;

        assert_eq!(ledger.successful().count(), 3);
        let calls = service.calls.lock();
        assert_eq!(calls[1].1 - calls[0].1, Duration::from_millis(6_000));
        assert_eq!(calls[2].1 - calls[1].1, Duration::from_millis(10_000));
        let first = ledger.get(PanelType::ElevationNorth).unwrap();
        assert_eq!(first.geometry_hash.as_deref(), Some("geom0000geom0000"));
        assert_eq!(first.spec_hash.as_deref(), Some("spec0000spec0000"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_then_success() {
        let service = Scripted::new(vec![Err(ServiceError::RateLimited { retry_after_ms: Some(40_000) })]);
        let orchestrator = Orchestrator::new(service.clone(), &GenerationConfig::default());
        let (_tx, rx) = watch::channel(false);
        let ledger = orchestrator.run(&identity(), &[job(PanelType::SectionAA, 9)], rx, &NoProgress).await;

        let result = &ledger.results()[0];
        assert!(result.is_success());
        assert_eq!(result.attempts, 2);
        let calls = service.calls.lock();
        assert_eq!(calls[1].1 - calls[0].1, Duration::from_millis(40_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_fails_panel_and_queue_continues() {
        let service = Scripted::new(vec![Err(ServiceError::Unauthorized)]);
        let orchestrator = Orchestrator::new(service.clone(), &GenerationConfig::default());
        let jobs = [job(PanelType::ElevationEast, 1), job(PanelType::ElevationWest, 2)];
        let (_tx, rx) = watch::channel(false);
        let ledger = orchestrator.run(&identity(), &jobs, rx, &NoProgress).await;

        assert_eq!(ledger.failed_panels(), vec![PanelType::ElevationEast]);
        let failed = &ledger.results()[0];
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.error.as_ref().and_then(|e| e.class), Some(ErrorClass::Fatal));
        assert!(failed.geometry_hash.is_none());
        assert!(ledger.get(PanelType::ElevationWest).unwrap().is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_retries_are_bounded() {
        let service = Scripted::new(vec![
            Err(ServiceError::Timeout),
            Err(ServiceError::Server { status: 502, message: "bad gateway".into() }),
            Err(ServiceError::Network { message: "reset".into() }),
        ]);
        let orchestrator = Orchestrator::new(service.clone(), &GenerationConfig::default());
        let (_tx, rx) = watch::channel(false);
        let ledger = orchestrator.run(&identity(), &[job(PanelType::SectionBB, 1)], rx, &NoProgress).await;

        let result = &ledger.results()[0];
        assert_eq!(result.status, PanelStatus::Failed);
        assert_eq!(result.attempts, 3);
        assert_eq!(service.calls.lock().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_stops_submissions() {
        let service = Scripted::new(vec![]);
        let orchestrator = Orchestrator::new(service.clone(), &GenerationConfig::default());
        let jobs = [
            job(PanelType::ElevationNorth, 1),
            job(PanelType::ElevationSouth, 2),
            job(PanelType::ElevationEast, 3),
        ];
        let (tx, rx) = watch::channel(false);
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1_000)).await;
            let _ = tx.send(true);
        });
        let ledger = orchestrator.run(&identity(), &jobs, rx, &NoProgress).await;
        canceller.await.unwrap();

        assert_eq!(service.calls.lock().len(), 1);
        assert!(ledger.results()[0].is_success());
        assert_eq!(ledger.results()[1].status, PanelStatus::Cancelled);
        assert_eq!(ledger.results()[2].status, PanelStatus::Cancelled);
        assert_eq!(ledger.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out_as_transient() {
        struct Stalling;

        #[async_trait]
        impl ImageService for Stalling {
            async fn generate(&self, _request: GenerationRequest) -> Result<GeneratedImage, ServiceError> {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Err(ServiceError::Unauthorized)
            }
        }

        let mut config = GenerationConfig::default();
        config.max_transient_retries = 0;
        let orchestrator = Orchestrator::new(Arc::new(Stalling), &config);
        let (_tx, rx) = watch::channel(false);
        let ledger = orchestrator.run(&identity(), &[job(PanelType::Hero3d, 1)], rx, &NoProgress).await;

        let error = ledger.results()[0].error.clone().unwrap();
        assert_eq!(error.class, Some(ErrorClass::Transient));
    }
}
