//! Panel jobs and prompt text.

use serde::{Deserialize, Serialize};

use super::service::GenerationRequest;
use crate::canonical::{init_image_params, CanonicalPack};
use crate::config::GenerationConfig;
use crate::geometry::BuildingModel;
use crate::panels::{PanelCategory, PanelType};
use crate::seed::derive_seeds;
use crate::spec::{RoofType, Specification};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelJob {
    pub panel: PanelType,
    pub prompt: String,
    pub negative_prompt: String,
    pub seed: u32,
    pub control_image: Option<String>,
    pub init_strength: Option<f64>,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance: f64,
}

impl PanelJob {
    pub fn category(&self) -> PanelCategory {
        self.panel.category()
    }

    pub fn request(&self) -> GenerationRequest {
        GenerationRequest {
            panel: self.panel,
            prompt: self.prompt.clone(),
            negative_prompt: self.negative_prompt.clone(),
            control_image: self.control_image.clone(),
            seed: self.seed,
            width: self.width,
            height: self.height,
            steps: self.steps,
            guidance: self.guidance,
            init_strength: self.init_strength,
        }
    }
}

/// One job per panel, seeded by position in `panels`.
pub fn build_jobs(
    spec: &Specification,
    model: &BuildingModel,
    pack: &CanonicalPack,
    panels: &[PanelType],
    base_seed: u64,
    config: &GenerationConfig,
) -> Vec<PanelJob> {
    derive_seeds(base_seed, panels)
        .into_iter()
        .map(|s| {
            let (width, height) = s.panel.canvas_size();
            PanelJob {
                panel: s.panel,
                prompt: build_prompt(spec, model, s.panel),
                negative_prompt: config.negative_prompt.clone(),
                seed: s.seed,
                control_image: pack.panel(s.panel).map(|p| p.control_image.clone()),
                init_strength: init_image_params(pack, s.panel).map(|p| p.strength),
                width,
                height,
                steps: config.steps,
                guidance: config.guidance,
            }
        })
        .collect()
}

fn roof_label(roof: RoofType) -> &'static str {
    match roof {
        RoofType::Flat => "flat",
        RoofType::Gable => "gable",
        RoofType::Hip => "hipped",
        RoofType::Mono => "mono-pitch",
    }
}

fn framing(panel: PanelType, model: &BuildingModel) -> String {
    if let Some(level) = panel.plan_level() {
        let rooms: Vec<String> = model
            .floor(level)
            .map(|f| f.rooms.iter().map(|r| format!("{} {:.0} m2", r.name, r.target_area_m2)).collect())
            .unwrap_or_default();
        return format!(
            "orthographic architectural floor plan, top-down, black linework on white, labelled rooms: {}",
            rooms.join(", ")
        );
    }
    if let Some(facade) = panel.facade() {
        return format!(
            "orthographic {:?} elevation, flat technical line drawing, no perspective",
            facade
        )
        .to_lowercase();
    }
    match panel {
        PanelType::SectionAA | PanelType::SectionBB => {
            "architectural section drawing, cut floor slabs, structural grid, technical linework".to_string()
        }
        PanelType::Hero3d => "photorealistic exterior perspective at eye level, soft daylight".to_string(),
        _ => "axonometric massing view, clean shading, white background".to_string(),
    }
}

pub fn build_prompt(spec: &Specification, model: &BuildingModel, panel: PanelType) -> String {
    let dims = model.dimensions();
    let storeys = if dims.floor_count == 1 { "single-storey".to_string() } else { format!("{}-storey", dims.floor_count) };
    let mut prompt = format!(
        "{}: {} {} building, {} facade, {} roof, {:.1} m x {:.1} m footprint, {}",
        panel.title(),
        storeys,
        spec.style.architecture,
        spec.style.materials.join(" and "),
        roof_label(spec.geometry_rules.roof_type),
        dims.width_m,
        dims.depth_m,
        framing(panel, model),
    );
    if panel.category() == PanelCategory::Render3d {
        if let Some(palette) = &spec.style.palette {
            prompt.push_str(&format!(", {} palette", palette));
        }
    }
    prompt
}
