//! ArchForge Core - Consistent Multi-Panel Architectural Sheets
//!
//! # The Six Laws (Non-Negotiable)
//! 1. The Specification Is Frozen
//! 2. Geometry Is Truth
//! 3. Seeds Are Derived, Never Chosen
//! 4. One Call In Flight
//! 5. Gates Fail Closed
//! 6. Hashes Travel With Every Panel

pub mod spec;
pub mod geometry;
pub mod canonical;
pub mod seed;
pub mod generation;
pub mod gates;
pub mod sheet;
pub mod panels;
pub mod hashing;
pub mod config;
pub mod cache;
pub mod pipeline;
pub mod jobs;

pub use spec::{freeze, normalize, validate_schema, FrozenSpec, Specification};
pub use geometry::{BuildingModel, GeometryError};
pub use canonical::{build_canonical_pack, CanonicalPack};
pub use seed::{derive_seed, derive_seeds};
pub use generation::{ImageRef, ImageService, OfflineRenderer, PanelResult};
pub use gates::{GateError, GateMode, ValidationReport};
pub use sheet::{compose_sheet, Sheet};
pub use panels::PanelType;
pub use hashing::{canonical_json, compute_run_hash, short_hash};
pub use config::PipelineConfig;
pub use pipeline::{PipelineError, PipelineRequest, PresentationPipeline, RunReport};
pub use jobs::{JobId, JobManager, JobSnapshot, JobStatus};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
