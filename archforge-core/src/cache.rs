//! Geometry cache - derived model and canonical pack per frozen spec.

use moka::sync::Cache;
use std::sync::Arc;
use tracing::debug;

use crate::canonical::{build_canonical_pack_with, CanonicalPack};
use crate::config::{CacheConfig, GenerationConfig};
use crate::geometry::{BuildingModel, GeometryError, MassingOverride};
use crate::hashing::short_hash;
use crate::panels::required_panels;
use crate::spec::FrozenSpec;

#[derive(Debug, Clone)]
pub struct CachedGeometry {
    pub model: Arc<BuildingModel>,
    pub pack: Arc<CanonicalPack>,
}

impl CachedGeometry {
    pub fn geometry_hash(&self) -> &str {
        &self.pack.geometry_hash
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct GeometryCache {
    inner: Cache<String, Arc<CachedGeometry>>,
}

impl GeometryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self { inner: Cache::new(config.max_entries) }
    }

    /// Key for a spec hash plus optional massing override.
    pub fn key(spec_hash: &str, massing: Option<&MassingOverride>) -> Result<String, serde_json::Error> {
        Ok(match massing {
            None => spec_hash.to_string(),
            Some(m) => format!("{}:{}", spec_hash, short_hash(m)?),
        })
    }

    pub fn get(&self, key: &str) -> Option<Arc<CachedGeometry>> {
        self.inner.get(key)
    }

    /// Cached geometry for `spec`, building model and pack on a miss.
    pub fn get_or_build(
        &self,
        spec: &FrozenSpec,
        massing: Option<&MassingOverride>,
        config: &GenerationConfig,
    ) -> Result<Arc<CachedGeometry>, CacheError> {
        let key = Self::key(spec.hash(), massing)?;
        if let Some(hit) = self.inner.get(&key) {
            debug!(spec_hash = %spec.hash(), geometry_hash = %hit.geometry_hash(), "geometry cache hit");
            return Ok(hit);
        }

        let model = BuildingModel::build(spec.spec(), massing)?;
        let pack = build_canonical_pack_with(&model, &required_panels(model.floors.len()), config)?;
        let entry = Arc::new(CachedGeometry { model: Arc::new(model), pack: Arc::new(pack) });
        self.inner.insert(key, Arc::clone(&entry));
        debug!(spec_hash = %spec.hash(), geometry_hash = %entry.geometry_hash(), "geometry cached");
        Ok(entry)
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.invalidate(key);
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}
