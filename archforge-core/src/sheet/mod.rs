//! Sheet Composer - validated panels onto one raster
//!
//! Panel keys are canonicalized on the way in; unknown keys are excluded,
//! logged and listed in the metadata. A required panel that cannot be read
//! or decoded aborts composition with that panel named.

mod grid;

pub use grid::{default_grid_cells, GridCell, PixelRect, SheetGrid};

use chrono::{DateTime, Utc};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SheetConfig;
use crate::gates::ComposeStamp;
use crate::generation::ImageRef;
use crate::panels::PanelType;
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Panel {panel} cannot be composed: {reason}")]
    Panel { panel: PanelType, reason: String },

    #[error("Overlay image unusable: {0}")]
    Overlay(String),

    #[error("Sheet encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// One panel image as delivered, under whatever key the producer used.
#[derive(Debug, Clone)]
pub struct SheetPanel {
    pub key: String,
    pub image: ImageRef,
}

impl SheetPanel {
    pub fn new(key: impl Into<String>, image: ImageRef) -> Self {
        Self { key: key.into(), image }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub panel: PanelType,
    /// Grid cell on the sheet.
    pub cell: PixelRect,
    /// Area actually covered by the fitted image.
    pub image: PixelRect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedPanel {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetMetadata {
    pub sheet_id: String,
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub geometry_hash: String,
    pub spec_hash: String,
    pub program_hash: String,
    pub placements: Vec<Placement>,
    pub excluded: Vec<ExcludedPanel>,
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub metadata: SheetMetadata,
}

pub fn compose_sheet(
    panels: &[SheetPanel],
    grid: &SheetGrid,
    required: &[PanelType],
    overlay: Option<&ImageRef>,
    stamp: &ComposeStamp,
    config: &SheetConfig,
) -> Result<Sheet, ComposeError> {
    let [r, g, b] = config.background;
    let mut canvas = RgbaImage::from_pixel(config.width, config.height, Rgba([r, g, b, 255]));
    let mut placements = vec![];
    let mut excluded = vec![];
    let mut placed: BTreeSet<PanelType> = BTreeSet::new();

    for input in panels {
        let Some(panel) = PanelType::from_key(&input.key) else {
            warn!(key = %input.key, "unrecognized panel key excluded from sheet");
            excluded.push(ExcludedPanel { key: input.key.clone(), reason: "unrecognized panel key".into() });
            continue;
        };
        if placed.contains(&panel) {
            warn!(key = %input.key, panel = %panel, "duplicate panel excluded from sheet");
            excluded.push(ExcludedPanel { key: input.key.clone(), reason: format!("duplicate of {}", panel) });
            continue;
        }
        let Some(cell) = grid.cell_px(panel, config.width, config.height) else {
            warn!(panel = %panel, "panel has no grid cell");
            excluded.push(ExcludedPanel { key: input.key.clone(), reason: "no grid cell".into() });
            continue;
        };

        let decoded = match load(&input.image) {
            Ok(img) => img,
            Err(reason) if required.contains(&panel) => return Err(ComposeError::Panel { panel, reason }),
            Err(reason) => {
                warn!(panel = %panel, error = %reason, "optional panel skipped");
                excluded.push(ExcludedPanel { key: input.key.clone(), reason });
                continue;
            }
        };

        let cropped = autocrop(&decoded, config.crop_tolerance);
        let image = place(&mut canvas, &cropped, cell, config.padding_px);
        debug!(panel = %panel, x = image.x, y = image.y, width = image.width, height = image.height, "panel placed");
        placements.push(Placement { panel, cell, image });
        placed.insert(panel);
    }

    if let Some(missing) = required.iter().find(|p| !placed.contains(p)) {
        return Err(ComposeError::Panel { panel: *missing, reason: "not supplied".into() });
    }

    if let Some(overlay) = overlay {
        let bytes = overlay.resolve().map_err(|e| ComposeError::Overlay(e.to_string()))?;
        let top = image::load_from_memory(&bytes).map_err(|e| ComposeError::Overlay(e.to_string()))?;
        let top = imageops::resize(&top.to_rgba8(), config.width, config.height, FilterType::Triangle);
        imageops::overlay(&mut canvas, &top, 0, 0);
    }

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .to_rgb8()
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    let metadata = SheetMetadata {
        sheet_id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        engine_version: ENGINE_VERSION.to_string(),
        geometry_hash: stamp.geometry_hash.clone(),
        spec_hash: stamp.spec_hash.clone(),
        program_hash: stamp.program_hash.clone(),
        placements,
        excluded,
    };
    Ok(Sheet { png, width: config.width, height: config.height, metadata })
}

fn load(image: &ImageRef) -> Result<RgbaImage, String> {
    let bytes = image.resolve().map_err(|e| format!("unreadable: {}", e))?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| format!("undecodable: {}", e))?;
    Ok(decoded.to_rgba8())
}

fn differs(a: &Rgba<u8>, b: &Rgba<u8>, tolerance: u8) -> bool {
    a.0.iter().zip(b.0.iter()).any(|(x, y)| x.abs_diff(*y) > tolerance)
}

/// Trim borders matching the top-left pixel colour.
pub(crate) fn autocrop(img: &RgbaImage, tolerance: u8) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let border = *img.get_pixel(0, 0);
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (w, h, 0, 0);
    for (x, y, px) in img.enumerate_pixels() {
        if differs(px, &border, tolerance) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if min_x > max_x || min_y > max_y {
        return img.clone();
    }
    imageops::crop_imm(img, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image()
}

/// Fit `img` into `cell` minus padding, centered, preserving aspect ratio.
fn place(canvas: &mut RgbaImage, img: &RgbaImage, cell: PixelRect, padding: u32) -> PixelRect {
    let inner_w = cell.width.saturating_sub(2 * padding).max(1);
    let inner_h = cell.height.saturating_sub(2 * padding).max(1);
    let (w, h) = img.dimensions();
    let scale = (inner_w as f64 / w.max(1) as f64).min(inner_h as f64 / h.max(1) as f64);
    let fit_w = ((w as f64 * scale).round() as u32).clamp(1, inner_w);
    let fit_h = ((h as f64 * scale).round() as u32).clamp(1, inner_h);
    let resized = imageops::resize(img, fit_w, fit_h, FilterType::Triangle);

    let x = cell.x + padding + (inner_w - fit_w) / 2;
    let y = cell.y + padding + (inner_h - fit_h) / 2;
    imageops::overlay(canvas, &resized, x as i64, y as i64);
    PixelRect { x, y, width: fit_w, height: fit_h }
}
