//! External image service contract and error classification.

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

use super::ImageRef;
use crate::panels::PanelType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub panel: PanelType,
    pub prompt: String,
    pub negative_prompt: String,
    /// SVG control drawing, when the panel has one.
    pub control_image: Option<String>,
    pub seed: u32,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance: f64,
    pub init_strength: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub image: ImageRef,
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceError {
    #[error("Rate limited by image service")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Image service request timed out")]
    Timeout,

    #[error("Image service error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Content rejected: {message}")]
    ContentRejected { message: String },
}

impl ServiceError {
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after_ms } => retry_after_ms.map(Duration::from_millis),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    RateLimited,
    Transient,
    Fatal,
}

pub fn classify(error: &ServiceError) -> ErrorClass {
    match error {
        ServiceError::RateLimited { .. } => ErrorClass::RateLimited,
        ServiceError::Server { status: 429, .. } => ErrorClass::RateLimited,
        ServiceError::Server { status, .. } if *status >= 500 || *status == 408 => ErrorClass::Transient,
        ServiceError::Timeout | ServiceError::Network { .. } => ErrorClass::Transient,
        ServiceError::Server { .. }
        | ServiceError::InvalidRequest { .. }
        | ServiceError::Unauthorized
        | ServiceError::ContentRejected { .. } => ErrorClass::Fatal,
    }
}

/// Generative image backend.
#[async_trait]
pub trait ImageService: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage, ServiceError>;
}

/// Deterministic placeholder backend for dry runs.
///
/// Draws a seed-coloured block inside a white margin, at a fraction of the
/// requested canvas, and encodes it as PNG.
#[derive(Debug, Clone)]
pub struct OfflineRenderer {
    downscale: u32,
    reject: BTreeSet<PanelType>,
}

impl Default for OfflineRenderer {
    fn default() -> Self {
        Self { downscale: 4, reject: BTreeSet::new() }
    }
}

impl OfflineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_downscale(mut self, factor: u32) -> Self {
        self.downscale = factor.max(1);
        self
    }

    /// Answer requests for `panel` with a fatal rejection.
    pub fn rejecting(mut self, panel: PanelType) -> Self {
        self.reject.insert(panel);
        self
    }

    pub fn render(&self, request: &GenerationRequest) -> Result<Vec<u8>, ServiceError> {
        let width = (request.width / self.downscale).max(8);
        let height = (request.height / self.downscale).max(8);
        let margin_x = width / 12;
        let margin_y = height / 12;
        let [r, g, b, _] = request.seed.to_le_bytes();
        let fill = Rgb([r % 192, g % 192, b % 192]);

        let img = RgbImage::from_fn(width, height, |x, y| {
            let inside = x >= margin_x && x < width - margin_x && y >= margin_y && y < height - margin_y;
            if inside {
                fill
            } else {
                Rgb([255, 255, 255])
            }
        });

        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ServiceError::InvalidRequest { message: e.to_string() })?;
        Ok(png)
    }
}

#[async_trait]
impl ImageService for OfflineRenderer {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedImage, ServiceError> {
        if self.reject.contains(&request.panel) {
            return Err(ServiceError::ContentRejected {
                message: format!("{} rejected by offline renderer", request.panel),
            });
        }
        let png = self.render(&request)?;
        Ok(GeneratedImage { image: ImageRef::inline(png) })
    }
}
