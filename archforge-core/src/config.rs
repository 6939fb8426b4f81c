//! Pipeline Configuration - tuned constants with serde defaults
//!
//! Tolerances, delays and retry counts are operational defaults, not
//! invariants. Any field may be overridden from a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::gates::GateMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid sheet grid: {0}")]
    Grid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub gates: GateConfig,
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Configuration with every delay set to zero, for offline runs.
    pub fn without_delays() -> Self {
        let mut config = Self::default();
        config.generation.clear_delays();
        config
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_technical_to_technical")]
    pub technical_to_technical_ms: u64,
    #[serde(default = "default_cross_category")]
    pub technical_to_render_ms: u64,
    #[serde(default = "default_cross_category")]
    pub render_to_technical_ms: u64,
    #[serde(default = "default_render_to_render")]
    pub render_to_render_ms: u64,
    #[serde(default = "default_rate_limit_cooldown")]
    pub rate_limit_cooldown_ms: u64,
    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
    #[serde(default = "default_transient_recovery")]
    pub transient_recovery_ms: u64,
    #[serde(default = "default_max_transient_retries")]
    pub max_transient_retries: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_guidance")]
    pub guidance: f64,
    #[serde(default = "default_technical_strength")]
    pub technical_strength: f64,
    #[serde(default = "default_hero_strength")]
    pub hero_strength: f64,
    #[serde(default = "default_axonometric_strength")]
    pub axonometric_strength: f64,
    #[serde(default = "default_negative_prompt")]
    pub negative_prompt: String,
}

fn default_technical_to_technical() -> u64 {
    6_000
}

fn default_cross_category() -> u64 {
    10_000
}

fn default_render_to_render() -> u64 {
    12_000
}

fn default_rate_limit_cooldown() -> u64 {
    30_000
}

fn default_max_rate_limit_retries() -> u32 {
    3
}

fn default_transient_recovery() -> u64 {
    5_000
}

fn default_max_transient_retries() -> u32 {
    2
}

fn default_request_timeout() -> u64 {
    90_000
}

fn default_steps() -> u32 {
    30
}

fn default_guidance() -> f64 {
    7.5
}

fn default_technical_strength() -> f64 {
    0.15
}

fn default_hero_strength() -> f64 {
    0.60
}

fn default_axonometric_strength() -> f64 {
    0.55
}

fn default_negative_prompt() -> String {
    "inconsistent geometry, extra floors, distorted perspective, text artifacts, watermark, \
     blurry, people, cars"
        .to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            technical_to_technical_ms: default_technical_to_technical(),
            technical_to_render_ms: default_cross_category(),
            render_to_technical_ms: default_cross_category(),
            render_to_render_ms: default_render_to_render(),
            rate_limit_cooldown_ms: default_rate_limit_cooldown(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
            transient_recovery_ms: default_transient_recovery(),
            max_transient_retries: default_max_transient_retries(),
            request_timeout_ms: default_request_timeout(),
            steps: default_steps(),
            guidance: default_guidance(),
            technical_strength: default_technical_strength(),
            hero_strength: default_hero_strength(),
            axonometric_strength: default_axonometric_strength(),
            negative_prompt: default_negative_prompt(),
        }
    }
}

impl GenerationConfig {
    /// Zero every inter-call and recovery delay; retry counts are kept.
    pub fn clear_delays(&mut self) {
        self.technical_to_technical_ms = 0;
        self.technical_to_render_ms = 0;
        self.render_to_technical_ms = 0;
        self.render_to_render_ms = 0;
        self.rate_limit_cooldown_ms = 0;
        self.transient_recovery_ms = 0;
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }

    pub fn transient_recovery(&self) -> Duration {
        Duration::from_millis(self.transient_recovery_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Fractional area deviation allowed per room (0.03 = 3%).
    #[serde(default = "default_area_tolerance")]
    pub area_tolerance: f64,
    /// Shortest shared wall that still counts as adjacency, in meters.
    #[serde(default = "default_min_shared_wall")]
    pub min_shared_wall_m: f64,
    #[serde(default)]
    pub mode: GateMode,
}

fn default_area_tolerance() -> f64 {
    0.03
}

fn default_min_shared_wall() -> f64 {
    0.9
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            area_tolerance: default_area_tolerance(),
            min_shared_wall_m: default_min_shared_wall(),
            mode: GateMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    #[serde(default = "default_sheet_width")]
    pub width: u32,
    #[serde(default = "default_sheet_height")]
    pub height: u32,
    #[serde(default = "default_background")]
    pub background: [u8; 3],
    #[serde(default = "default_padding")]
    pub padding_px: u32,
    /// Per-channel difference still treated as border colour when cropping.
    #[serde(default = "default_crop_tolerance")]
    pub crop_tolerance: u8,
    #[serde(default = "default_grid")]
    pub grid: Vec<GridCellConfig>,
}

// A1 landscape at 150 dpi.
fn default_sheet_width() -> u32 {
    4967
}

fn default_sheet_height() -> u32 {
    3508
}

fn default_background() -> [u8; 3] {
    [255, 255, 255]
}

fn default_padding() -> u32 {
    12
}

fn default_crop_tolerance() -> u8 {
    8
}

fn default_grid() -> Vec<GridCellConfig> {
    crate::sheet::default_grid_cells()
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            width: default_sheet_width(),
            height: default_sheet_height(),
            background: default_background(),
            padding_px: default_padding(),
            crop_tolerance: default_crop_tolerance(),
            grid: default_grid(),
        }
    }
}

/// One grid cell as written in config; `panel` may use any known spelling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridCellConfig {
    pub panel: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub max_entries: u64,
}

fn default_cache_capacity() -> u64 {
    64
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: default_cache_capacity() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.gates.area_tolerance, 0.03);
        assert_eq!(config.generation.max_rate_limit_retries, 3);
        assert_eq!(config.generation.technical_strength, 0.15);
        assert!(!config.sheet.grid.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [gates]
            area_tolerance = 0.05
            mode = "report"

            [sheet]
            width = 800
            height = 600
            "#,
        )
        .unwrap();
        assert_eq!(config.gates.area_tolerance, 0.05);
        assert_eq!(config.gates.mode, GateMode::Report);
        assert_eq!(config.gates.min_shared_wall_m, 0.9);
        assert_eq!(config.sheet.width, 800);
        assert_eq!(config.sheet.padding_px, 12);
        assert_eq!(config.generation.steps, 30);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archforge.toml");
        fs::write(&path, "[generation]\nsteps = 12\n").unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.generation.steps, 12);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = PipelineConfig::from_toml_str("[gates\narea_tolerance = ").unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    fn test_without_delays_zeroes_waits() {
        let config = PipelineConfig::without_delays();
        assert_eq!(config.generation.rate_limit_cooldown(), Duration::ZERO);
        assert_eq!(config.generation.render_to_render_ms, 0);
        assert_eq!(config.generation.max_transient_retries, 2);
    }
}
