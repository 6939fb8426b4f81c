//! Frozen specification - one authoritative, hash-identified value.
//!
//! A [`FrozenSpec`] hands out shared references only. Edits never happen in
//! place: [`FrozenSpec::revise`] returns a new version with a new hash. The
//! dynamic edit entry point [`FrozenSpec::set_field`] exists for callers at
//! the JSON boundary and either rejects (strict) or ignores (lenient) writes.

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::{validate_schema, Specification};
use crate::hashing::short_hash;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreezeMode {
    #[default]
    Strict,
    Lenient,
}

#[derive(Debug, Error)]
pub enum FreezeError {
    #[error("Specification {hash} is frozen; write to {path} rejected")]
    Frozen { hash: String, path: String },

    #[error("No field at {0}")]
    UnknownField(String),

    #[error("Revision produced an invalid specification: {0}")]
    InvalidRevision(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct FrozenSpec {
    inner: Arc<Specification>,
    hash: String,
    version: u32,
    parent: Option<String>,
    mode: FreezeMode,
}

/// Freeze a normalized specification and compute its hash.
pub fn freeze(spec: Specification, mode: FreezeMode) -> Result<FrozenSpec, serde_json::Error> {
    let hash = short_hash(&spec)?;
    debug!(spec_hash = %hash, "specification frozen");
    Ok(FrozenSpec { inner: Arc::new(spec), hash, version: 1, parent: None, mode })
}

impl FrozenSpec {
    pub fn spec(&self) -> &Specification {
        &self.inner
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Hash of the version this one was revised from.
    pub fn parent_hash(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn mode(&self) -> FreezeMode {
        self.mode
    }

    pub fn shared(&self) -> Arc<Specification> {
        Arc::clone(&self.inner)
    }

    /// Attempt an in-place write addressed by JSON pointer (`/program/rooms/0/area_m2`).
    ///
    /// The value is never changed. Strict mode reports the attempt as an
    /// error; lenient mode logs it and returns `Ok`.
    pub fn set_field(&self, pointer: &str, _value: serde_json::Value) -> Result<(), FreezeError> {
        let current = serde_json::to_value(self.spec())?;
        if current.pointer(pointer).is_none() {
            return Err(FreezeError::UnknownField(pointer.to_string()));
        }
        match self.mode {
            FreezeMode::Strict => Err(FreezeError::Frozen {
                hash: self.hash.clone(),
                path: pointer.to_string(),
            }),
            FreezeMode::Lenient => {
                warn!(spec_hash = %self.hash, path = pointer, "write to frozen specification ignored");
                Ok(())
            }
        }
    }

    /// Produce a new frozen version with `edit` applied to a copy.
    pub fn revise<F>(&self, edit: F) -> Result<FrozenSpec, FreezeError>
    where
        F: FnOnce(&mut Specification),
    {
        let mut draft = (*self.inner).clone();
        edit(&mut draft);
        self.successor(draft)
    }

    /// Produce a new frozen version with one field replaced by JSON pointer.
    pub fn revise_field(&self, pointer: &str, value: serde_json::Value) -> Result<FrozenSpec, FreezeError> {
        let mut draft = serde_json::to_value(self.spec())?;
        let slot = draft
            .pointer_mut(pointer)
            .ok_or_else(|| FreezeError::UnknownField(pointer.to_string()))?;
        *slot = value;
        let spec: Specification = serde_json::from_value(draft)
            .map_err(|e| FreezeError::InvalidRevision(e.to_string()))?;
        self.successor(spec)
    }

    fn successor(&self, spec: Specification) -> Result<FrozenSpec, FreezeError> {
        let report = validate_schema(&spec);
        if !report.valid {
            let reasons: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
            let reasons = if reasons.is_empty() { report.missing_sections.join(", ") } else { reasons.join("; ") };
            return Err(FreezeError::InvalidRevision(reasons));
        }
        let hash = short_hash(&spec)?;
        debug!(parent = %self.hash, spec_hash = %hash, version = self.version + 1, "specification revised");
        Ok(FrozenSpec {
            inner: Arc::new(spec),
            hash,
            version: self.version + 1,
            parent: Some(self.hash.clone()),
            mode: self.mode,
        })
    }
}

impl Deref for FrozenSpec {
    type Target = Specification;

    fn deref(&self) -> &Specification {
        &self.inner
    }
}

impl PartialEq for FrozenSpec {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}
