//! Presentation Pipeline - Single Entry Point
//!
//! CRITICAL: composition MUST pass through the gates. No bypass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{CacheError, CachedGeometry, GeometryCache};
use crate::config::{ConfigError, PipelineConfig};
use crate::gates::{
    check_compose, check_drift, check_program, enforce, ComposeInput, ComposeStamp, GateError, ProgramLock,
    ValidationReport,
};
use crate::generation::{
    build_jobs, ErrorClass, ImageRef, ImageService, Orchestrator, PanelJob, PanelLedger, PanelStatus,
    ProgressSink, RunIdentity,
};
use crate::geometry::{GeometryError, MassingOverride};
use crate::hashing::compute_run_hash;
use crate::panels::{required_panels, PanelType};
use crate::seed::base_seed_from_hash;
use crate::sheet::{compose_sheet, ComposeError, Sheet, SheetGrid, SheetMetadata, SheetPanel};
use crate::spec::{freeze, normalize, validate_schema, FreezeMode, FrozenSpec, Repair, SchemaReport};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static GATE_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_gate_call_count() -> u32 {
    GATE_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_gate_call_count() {
    GATE_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Specification invalid: {}", summarize(.0))]
    InvalidSpecification(SchemaReport),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Canonical pack incomplete: {}", join_panels(.0))]
    PackIncomplete(Vec<PanelType>),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("Composition failed: {0}")]
    Compose(#[from] ComposeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Run cancelled after {completed} panels")]
    Cancelled { completed: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CacheError> for PipelineError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Geometry(e) => Self::Geometry(e),
            CacheError::Serialization(e) => Self::Serialization(e),
        }
    }
}

impl PipelineError {
    /// Whether the failure came from a validation gate or the schema check.
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, Self::InvalidSpecification(_) | Self::Gate(_) | Self::PackIncomplete(_))
    }
}

fn summarize(report: &SchemaReport) -> String {
    let errors: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
    errors.join("; ")
}

fn join_panels(panels: &[PanelType]) -> String {
    let keys: Vec<&str> = panels.iter().map(|p| p.key()).collect();
    keys.join(", ")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Raw design description, repaired by the normalizer.
    pub input: Value,
    #[serde(default)]
    pub base_seed: Option<u64>,
    #[serde(default)]
    pub massing: Option<MassingOverride>,
    #[serde(default)]
    pub overlay: Option<ImageRef>,
}

impl PipelineRequest {
    pub fn new(input: Value) -> Self {
        Self { input, ..Self::default() }
    }

    pub fn with_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = Some(base_seed);
        self
    }
}

/// Everything decided before the first generation call.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub spec: FrozenSpec,
    pub repairs: Vec<Repair>,
    pub geometry: Arc<CachedGeometry>,
    pub lock: ProgramLock,
    pub program_hash: String,
    pub base_seed: u64,
    pub run_hash: String,
    pub required: Vec<PanelType>,
    pub jobs: Vec<PanelJob>,
}

impl PreparedRun {
    pub fn geometry_hash(&self) -> &str {
        self.geometry.geometry_hash()
    }

    pub fn identity(&self) -> RunIdentity {
        RunIdentity { spec_hash: self.spec.hash().to_string(), geometry_hash: self.geometry_hash().to_string() }
    }
}

/// Per-panel line of a run report, without image bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelOutcome {
    pub panel: PanelType,
    pub status: PanelStatus,
    pub seed: u32,
    pub attempts: u32,
    pub error_class: Option<ErrorClass>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub run_hash: String,
    pub engine_version: String,
    pub spec_hash: String,
    pub geometry_hash: String,
    pub program_hash: String,
    pub base_seed: u64,
    pub repairs: Vec<Repair>,
    pub panels: Vec<PanelOutcome>,
    pub gates: Vec<ValidationReport>,
    pub sheet: SheetMetadata,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub report: RunReport,
    pub ledger: PanelLedger,
    pub sheet: Sheet,
}

/// The presentation pipeline - single entry point from raw input to sheet
pub struct PresentationPipeline {
    service: Arc<dyn ImageService>,
    config: PipelineConfig,
    cache: GeometryCache,
    grid: SheetGrid,
}

impl PresentationPipeline {
    pub fn new(service: Arc<dyn ImageService>, config: PipelineConfig) -> Result<Self, PipelineError> {
        let grid = SheetGrid::from_config(&config.sheet.grid)?;
        let cache = GeometryCache::new(&config.cache);
        Ok(Self { service, config, cache, grid })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &GeometryCache {
        &self.cache
    }

    /// Normalize, validate and freeze the input, then derive geometry,
    /// canonical pack and panel jobs.
    pub fn prepare(&self, request: &PipelineRequest) -> Result<PreparedRun, PipelineError> {
        let normalized = normalize(&request.input);
        let schema = validate_schema(&normalized.spec);
        if !schema.valid {
            warn!(errors = schema.errors.len(), missing = ?schema.missing_sections, "specification rejected");
            return Err(PipelineError::InvalidSpecification(schema));
        }
        let spec = freeze(normalized.spec, FreezeMode::Strict)?;
        let geometry = self.cache.get_or_build(&spec, request.massing.as_ref(), &self.config.generation)?;
        if !geometry.pack.is_complete() {
            let failed = geometry.pack.failed.iter().map(|f| f.panel).collect();
            return Err(PipelineError::PackIncomplete(failed));
        }

        let lock = ProgramLock::from_program(&spec.spec().program);
        let program_hash = lock.program_hash()?;
        let base_seed = request.base_seed.unwrap_or_else(|| base_seed_from_hash(spec.hash()));
        let run_hash = compute_run_hash(spec.hash(), geometry.geometry_hash(), base_seed, ENGINE_VERSION);
        let required = required_panels(geometry.model.floors.len());
        let jobs = build_jobs(spec.spec(), &geometry.model, &geometry.pack, &required, base_seed, &self.config.generation);

        info!(
            spec_hash = %spec.hash(),
            geometry_hash = %geometry.geometry_hash(),
            base_seed,
            panels = jobs.len(),
            "run prepared"
        );
        Ok(PreparedRun {
            spec,
            repairs: normalized.repairs,
            geometry,
            lock,
            program_hash,
            base_seed,
            run_hash,
            required,
            jobs,
        })
    }

    /// Full run: prepare, generate every panel in order, gate, compose.
    pub async fn run(
        &self,
        request: &PipelineRequest,
        cancel: watch::Receiver<bool>,
        progress: &dyn ProgressSink,
    ) -> Result<PipelineRun, PipelineError> {
        let prepared = self.prepare(request)?;
        self.run_prepared(&prepared, request.overlay.as_ref(), cancel, progress).await
    }

    pub async fn run_prepared(
        &self,
        prepared: &PreparedRun,
        overlay: Option<&ImageRef>,
        cancel: watch::Receiver<bool>,
        progress: &dyn ProgressSink,
    ) -> Result<PipelineRun, PipelineError> {
        let orchestrator = Orchestrator::new(Arc::clone(&self.service), &self.config.generation);
        let ledger = orchestrator.run(&prepared.identity(), &prepared.jobs, cancel.clone(), progress).await;
        if *cancel.borrow() {
            return Err(PipelineError::Cancelled { completed: ledger.successful().count() });
        }
        self.compose(prepared, ledger, overlay)
    }

    /// Gate the ledger and compose the sheet.
    ///
    /// This ALWAYS runs all three gates first.
    pub fn compose(
        &self,
        prepared: &PreparedRun,
        ledger: PanelLedger,
        overlay: Option<&ImageRef>,
    ) -> Result<PipelineRun, PipelineError> {
        let (gates, stamp) = self.run_gates(prepared, &ledger)?;

        let placeable: Vec<PanelType> = prepared
            .required
            .iter()
            .copied()
            .filter(|p| ledger.get(*p).is_some_and(|r| r.is_success()))
            .collect();
        let panels: Vec<SheetPanel> = ledger
            .successful()
            .filter_map(|r| r.image.clone().map(|image| SheetPanel::new(r.panel.key(), image)))
            .collect();
        let sheet = compose_sheet(&panels, &self.grid, &placeable, overlay, &stamp, &self.config.sheet)?;

        let report = RunReport {
            run_id: Uuid::new_v4().to_string(),
            run_hash: prepared.run_hash.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            spec_hash: prepared.spec.hash().to_string(),
            geometry_hash: prepared.geometry_hash().to_string(),
            program_hash: prepared.program_hash.clone(),
            base_seed: prepared.base_seed,
            repairs: prepared.repairs.clone(),
            panels: ledger
                .results()
                .iter()
                .map(|r| PanelOutcome {
                    panel: r.panel,
                    status: r.status,
                    seed: r.seed,
                    attempts: r.attempts,
                    error_class: r.error.as_ref().and_then(|e| e.class),
                    error: r.error.as_ref().map(|e| e.message.clone()),
                })
                .collect(),
            gates,
            sheet: sheet.metadata.clone(),
            created_at: Utc::now(),
        };
        info!(run_hash = %report.run_hash, placements = report.sheet.placements.len(), "sheet composed");
        Ok(PipelineRun { report, ledger, sheet })
    }

    fn run_gates(
        &self,
        prepared: &PreparedRun,
        ledger: &PanelLedger,
    ) -> Result<(Vec<ValidationReport>, ComposeStamp), GateError> {
        #[cfg(feature = "test-hooks")]
        GATE_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let gates = &self.config.gates;
        let model = &prepared.geometry.model;
        let adjacency = model.adjacency_report_with(gates.min_shared_wall_m);
        let program = check_program(&prepared.lock, &model.realized_program(), &adjacency, gates.area_tolerance);
        let drift = check_drift(prepared.geometry_hash(), ledger.results());
        let compose = check_compose(&ComposeInput {
            spec_hash: prepared.spec.hash(),
            geometry_hash: prepared.geometry_hash(),
            program_hash: &prepared.program_hash,
            required: &prepared.required,
            results: ledger.results(),
        });

        for report in [&program, &drift, &compose.report] {
            if !report.valid {
                warn!(gate = %report.gate, subjects = ?report.failing_subjects(), "gate reported violations");
            }
        }

        let program = enforce(gates.mode, program)?;
        let drift = enforce(gates.mode, drift)?;
        let compose_report = enforce(gates.mode, compose.report)?;
        Ok((vec![program, drift, compose_report], compose.stamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetConfig;
    use crate::gates::GateMode;
    use crate::generation::{NoProgress, OfflineRenderer};
    use serde_json::json;

    fn input() -> Value {
        json!({
            "program": {"floors": 1, "rooms": [
                {"name": "Living", "area": 25},
                {"name": "Kitchen", "area": 15},
                {"name": "Hallway", "area": 8}
            ]}
        })
    }

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::without_delays();
        config.sheet = SheetConfig { width: 600, height: 420, ..SheetConfig::default() };
        config
    }

    fn pipeline(service: OfflineRenderer) -> PresentationPipeline {
        PresentationPipeline::new(Arc::new(service.with_downscale(16)), config()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_run_composes_every_required_panel() {
        let pipeline = pipeline(OfflineRenderer::new());
        let (_tx, rx) = watch::channel(false);
        let run = pipeline.run(&PipelineRequest::new(input()).with_seed(12345), rx, &NoProgress).await.unwrap();
        assert_eq!(run.report.panels.len(), 9);
        assert_eq!(run.report.sheet.placements.len(), 9);
        assert!(run.report.gates.iter().all(|g| g.valid));
        assert_eq!(run.report.panels[1].seed, 12482);
        assert_eq!((run.sheet.width, run.sheet.height), (600, 420));
    }

    #[test]
    fn test_prepare_is_deterministic() {
        let pipeline = pipeline(OfflineRenderer::new());
        let request = PipelineRequest::new(input()).with_seed(9);
        let a = pipeline.prepare(&request).unwrap();
        let b = pipeline.prepare(&request).unwrap();
        assert_eq!(a.run_hash, b.run_hash);
        assert_eq!(a.geometry_hash(), b.geometry_hash());
        assert!(Arc::ptr_eq(&a.geometry, &b.geometry));
    }

    #[test]
    fn test_empty_program_rejected_before_generation() {
        let pipeline = pipeline(OfflineRenderer::new());
        let err = pipeline.prepare(&PipelineRequest::new(json!({}))).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSpecification(_)));
        assert!(err.is_validation_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_panel_fails_compose_gate() {
        let pipeline = pipeline(OfflineRenderer::new().rejecting(PanelType::SectionAA));
        let (_tx, rx) = watch::channel(false);
        let err = pipeline.run(&PipelineRequest::new(input()), rx, &NoProgress).await.unwrap_err();
        match err {
            PipelineError::Gate(GateError::Compose(report)) => {
                assert_eq!(report.failing_subjects(), vec!["section_a_a".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_mode_composes_partial_sheet() {
        let mut config = config();
        config.gates.mode = GateMode::Report;
        let service = OfflineRenderer::new().with_downscale(16).rejecting(PanelType::Hero3d);
        let pipeline = PresentationPipeline::new(Arc::new(service), config).unwrap();
        let (_tx, rx) = watch::channel(false);
        let run = pipeline.run(&PipelineRequest::new(input()), rx, &NoProgress).await.unwrap();
        assert_eq!(run.report.sheet.placements.len(), 8);
        assert!(!run.report.gates[2].valid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let pipeline = pipeline(OfflineRenderer::new());
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let err = pipeline.run(&PipelineRequest::new(input()), rx, &NoProgress).await.unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { completed: 0 }));
    }
}
