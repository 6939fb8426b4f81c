//! Canonical Geometry Pack - one control drawing per panel
//!
//! Control images are SVG line drawings computed purely from model
//! coordinates. The pack's geometry hash is taken over the serialized
//! [`BuildingModel`], never over the specification, so presentation-only
//! fields (palette, materials) cannot move it.

mod elevation;
mod plan;
mod projection;
mod svg;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GenerationConfig;
use crate::geometry::BuildingModel;
use crate::hashing::{sha256_hex, short_hash};
use crate::panels::{required_panels, PanelCategory, PanelType};
use elevation::Cut;
use projection::View;

pub const CONTROL_IMAGE_MIME: &str = "image/svg+xml";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("{panel} requires floor {floor}, building has {available}")]
    MissingFloor { panel: PanelType, floor: usize, available: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackStatus {
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPanel {
    pub panel: PanelType,
    pub control_image: String,
    pub mime: String,
    pub blend_strength: f64,
    pub geometry_hash: String,
    pub width: u32,
    pub height: u32,
    /// SHA-256 of the control image bytes.
    pub image_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedPanel {
    pub panel: PanelType,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPack {
    pub status: PackStatus,
    pub geometry_hash: String,
    pub panels: BTreeMap<PanelType, CanonicalPanel>,
    #[serde(default)]
    pub failed: Vec<FailedPanel>,
}

impl CanonicalPack {
    pub fn is_complete(&self) -> bool {
        self.status == PackStatus::Complete
    }

    pub fn panel(&self, panel: PanelType) -> Option<&CanonicalPanel> {
        self.panels.get(&panel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitImageParams {
    pub strength: f64,
}

/// Content hash of a model's geometry.
pub fn geometry_hash(model: &BuildingModel) -> Result<String, serde_json::Error> {
    short_hash(model)
}

/// Build the pack for every panel the model requires, with default strengths.
pub fn build_canonical_pack(model: &BuildingModel) -> Result<CanonicalPack, serde_json::Error> {
    build_canonical_pack_with(model, &required_panels(model.floors.len()), &GenerationConfig::default())
}

/// Build the pack for an explicit panel list.
///
/// Panels that cannot be drawn (a plan for a floor the building does not
/// have) are listed in `failed` and mark the pack [`PackStatus::Failed`].
pub fn build_canonical_pack_with(
    model: &BuildingModel,
    panels: &[PanelType],
    config: &GenerationConfig,
) -> Result<CanonicalPack, serde_json::Error> {
    let geometry_hash = geometry_hash(model)?;
    let mut rendered = BTreeMap::new();
    let mut failed = vec![];

    for &panel in panels {
        match render_control_image(model, panel) {
            Ok(svg) => {
                let (width, height) = panel.canvas_size();
                rendered.insert(
                    panel,
                    CanonicalPanel {
                        panel,
                        image_hash: sha256_hex(svg.as_bytes()),
                        control_image: svg,
                        mime: CONTROL_IMAGE_MIME.to_string(),
                        blend_strength: blend_strength(panel, config),
                        geometry_hash: geometry_hash.clone(),
                        width,
                        height,
                    },
                );
            }
            Err(e) => {
                warn!(panel = %panel, error = %e, "control image not rendered");
                failed.push(FailedPanel { panel, reason: e.to_string() });
            }
        }
    }

    let status = if failed.is_empty() { PackStatus::Complete } else { PackStatus::Failed };
    debug!(geometry_hash = %geometry_hash, panels = rendered.len(), status = ?status, "canonical pack built");
    Ok(CanonicalPack { status, geometry_hash, panels: rendered, failed })
}

/// Init-image strength for `panel`; `None` when the pack has no drawing for it.
pub fn init_image_params(pack: &CanonicalPack, panel: PanelType) -> Option<InitImageParams> {
    pack.panel(panel).map(|p| InitImageParams { strength: p.blend_strength })
}

fn blend_strength(panel: PanelType, config: &GenerationConfig) -> f64 {
    match (panel.category(), panel) {
        (PanelCategory::TechnicalDrawing, _) => config.technical_strength,
        (PanelCategory::Render3d, PanelType::Hero3d) => config.hero_strength,
        (PanelCategory::Render3d, _) => config.axonometric_strength,
    }
}

pub fn render_control_image(model: &BuildingModel, panel: PanelType) -> Result<String, RenderError> {
    let canvas = panel.canvas_size();
    if let Some(level) = panel.plan_level() {
        let floor = model.floor(level).ok_or(RenderError::MissingFloor {
            panel,
            floor: level,
            available: model.floors.len(),
        })?;
        return Ok(plan::render(model, floor, canvas));
    }
    if let Some(facade) = panel.facade() {
        return Ok(elevation::render_elevation(model, facade, canvas));
    }
    let svg = match panel {
        PanelType::SectionAA => elevation::render_section(model, Cut::Longitudinal, canvas),
        PanelType::SectionBB => elevation::render_section(model, Cut::Transverse, canvas),
        PanelType::Hero3d => projection::render(model, View::Hero, canvas),
        _ => projection::render(model, View::Axonometric, canvas),
    };
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::tests::three_room_spec;
    use crate::geometry::MassingOverride;
    use crate::panels::PANEL_ORDER;

    fn model() -> BuildingModel {
        BuildingModel::build(&three_room_spec(), None).unwrap()
    }

    #[test]
    fn test_pack_covers_required_panels() {
        let pack = build_canonical_pack(&model()).unwrap();
        assert!(pack.is_complete());
        assert_eq!(pack.geometry_hash.len(), 16);
        // One floor: ground plan only.
        assert_eq!(pack.panels.len(), 9);
        assert!(pack.panel(PanelType::FloorPlanFirst).is_none());
        for panel in pack.panels.values() {
            assert_eq!(panel.geometry_hash, pack.geometry_hash);
            assert_eq!(panel.mime, CONTROL_IMAGE_MIME);
        }
    }

    #[test]
    fn test_plan_for_missing_floor_fails_pack() {
        let pack = build_canonical_pack_with(&model(), &PANEL_ORDER, &GenerationConfig::default()).unwrap();
        assert_eq!(pack.status, PackStatus::Failed);
        let failed: Vec<_> = pack.failed.iter().map(|f| f.panel).collect();
        assert_eq!(failed, vec![PanelType::FloorPlanFirst, PanelType::FloorPlanSecond]);
    }

    #[test]
    fn test_strength_tiers() {
        let pack = build_canonical_pack(&model()).unwrap();
        let strength = |p| init_image_params(&pack, p).unwrap().strength;
        assert_eq!(strength(PanelType::ElevationNorth), 0.15);
        assert_eq!(strength(PanelType::SectionBB), 0.15);
        assert_eq!(strength(PanelType::Hero3d), 0.60);
        assert_eq!(strength(PanelType::Axonometric3d), 0.55);
        assert!(init_image_params(&pack, PanelType::FloorPlanSecond).is_none());
    }

    #[test]
    fn test_pack_is_byte_identical_across_builds() {
        let a = build_canonical_pack(&model()).unwrap();
        let b = build_canonical_pack(&model()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_massing_change_moves_hash() {
        let spec = three_room_spec();
        let narrow = BuildingModel::build(&spec, Some(&MassingOverride { width_m: Some(12.0), ..Default::default() })).unwrap();
        let wide = BuildingModel::build(&spec, Some(&MassingOverride { width_m: Some(25.0), ..Default::default() })).unwrap();
        assert_ne!(geometry_hash(&narrow).unwrap(), geometry_hash(&wide).unwrap());
    }
}
