//! Panel Generation - sequential, seed-deterministic calls to the image service
//!
//! The external generator is a capability behind [`ImageService`]. The
//! [`Orchestrator`] owns all retry and backoff behaviour: one call in
//! flight, category-aware delays between calls, and a classifier-driven
//! retry state machine.

mod orchestrator;
mod prompt;
mod retry;
mod schedule;
mod service;

pub use orchestrator::{
    NoProgress, Orchestrator, PanelFailure, PanelLedger, PanelResult, PanelStatus, ProgressSink,
    RunIdentity,
};
pub use prompt::{build_jobs, build_prompt, PanelJob};
pub use retry::{RetryDecision, RetryPolicy, RetryState};
pub use schedule::DelayTable;
pub use service::{
    classify, ErrorClass, GeneratedImage, GenerationRequest, ImageService, OfflineRenderer,
    ServiceError,
};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where a generated image lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageRef {
    Inline {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
    File {
        path: PathBuf,
    },
}

impl ImageRef {
    pub fn inline(data: Vec<u8>) -> Self {
        Self::Inline { data }
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File { path: path.as_ref().to_path_buf() }
    }

    /// Load the image bytes.
    pub fn resolve(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Inline { data } => Ok(data.clone()),
            Self::File { path } => fs::read(path),
        }
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_ref_serializes_as_base64() {
        let image = ImageRef::inline(vec![0x89, b'P', b'N', b'G']);
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["kind"], "inline");
        assert_eq!(json["data"], "iVBORw==");
        let back: ImageRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_file_ref_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.png");
        fs::write(&path, b"bytes").unwrap();
        assert_eq!(ImageRef::file(&path).resolve().unwrap(), b"bytes");
        assert!(ImageRef::file(dir.path().join("missing.png")).resolve().is_err());
    }
}
