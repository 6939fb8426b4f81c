//! Named sheet grid: canonical panel key to fractional cell.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{ConfigError, GridCellConfig};
use crate::panels::PanelType;

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl GridCell {
    fn overlaps(&self, other: &GridCell) -> bool {
        self.x < other.x + other.width - EPS
            && other.x < self.x + self.width - EPS
            && self.y < other.y + other.height - EPS
            && other.y < self.y + self.height - EPS
    }
}

/// Pixel rectangle on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn overlaps(&self, other: &PixelRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetGrid {
    cells: BTreeMap<PanelType, GridCell>,
}

impl SheetGrid {
    /// Validate configured cells: known keys, inside the unit square, no overlaps.
    pub fn from_config(cells: &[GridCellConfig]) -> Result<Self, ConfigError> {
        let mut out: BTreeMap<PanelType, GridCell> = BTreeMap::new();
        for cfg in cells {
            let panel = PanelType::from_key(&cfg.panel)
                .ok_or_else(|| ConfigError::Grid(format!("unknown panel key '{}'", cfg.panel)))?;
            let cell = GridCell { x: cfg.x, y: cfg.y, width: cfg.width, height: cfg.height };
            let inside = cell.width > 0.0
                && cell.height > 0.0
                && cell.x >= -EPS
                && cell.y >= -EPS
                && cell.x + cell.width <= 1.0 + EPS
                && cell.y + cell.height <= 1.0 + EPS;
            if !inside {
                return Err(ConfigError::Grid(format!("cell for {} lies outside the sheet", panel)));
            }
            if let Some((other, _)) = out.iter().find(|(_, c)| c.overlaps(&cell)) {
                return Err(ConfigError::Grid(format!("cells for {} and {} overlap", other, panel)));
            }
            if out.insert(panel, cell).is_some() {
                return Err(ConfigError::Grid(format!("duplicate cell for {}", panel)));
            }
        }
        Ok(Self { cells: out })
    }

    pub fn cell(&self, panel: PanelType) -> Option<&GridCell> {
        self.cells.get(&panel)
    }

    pub fn panels(&self) -> impl Iterator<Item = PanelType> + '_ {
        self.cells.keys().copied()
    }

    /// Cell in pixels on a `width` x `height` sheet. Edges are rounded so
    /// neighbouring cells share a boundary and never overlap.
    pub fn cell_px(&self, panel: PanelType, width: u32, height: u32) -> Option<PixelRect> {
        let cell = self.cell(panel)?;
        let (w, h) = (width as f64, height as f64);
        let x0 = (cell.x * w).round() as u32;
        let y0 = (cell.y * h).round() as u32;
        let x1 = ((cell.x + cell.width) * w).round().min(w) as u32;
        let y1 = ((cell.y + cell.height) * h).round().min(h) as u32;
        Some(PixelRect { x: x0, y: y0, width: x1.saturating_sub(x0), height: y1.saturating_sub(y0) })
    }
}

fn cell(panel: PanelType, x: f64, y: f64, width: f64, height: f64) -> GridCellConfig {
    GridCellConfig { panel: panel.key().to_string(), x, y, width, height }
}

/// Three-band presentation layout: hero and plans, elevations, then
/// sections, upper plan and axonometric.
pub fn default_grid_cells() -> Vec<GridCellConfig> {
    vec![
        cell(PanelType::Hero3d, 0.0, 0.0, 0.5, 0.36),
        cell(PanelType::FloorPlanGround, 0.5, 0.0, 0.25, 0.36),
        cell(PanelType::FloorPlanFirst, 0.75, 0.0, 0.25, 0.36),
        cell(PanelType::ElevationNorth, 0.0, 0.36, 0.25, 0.30),
        cell(PanelType::ElevationSouth, 0.25, 0.36, 0.25, 0.30),
        cell(PanelType::ElevationEast, 0.5, 0.36, 0.25, 0.30),
        cell(PanelType::ElevationWest, 0.75, 0.36, 0.25, 0.30),
        cell(PanelType::SectionAA, 0.0, 0.66, 0.25, 0.34),
        cell(PanelType::SectionBB, 0.25, 0.66, 0.25, 0.34),
        cell(PanelType::FloorPlanSecond, 0.5, 0.66, 0.25, 0.34),
        cell(PanelType::Axonometric3d, 0.75, 0.66, 0.25, 0.34),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::PANEL_ORDER;

    #[test]
    fn test_default_grid_is_valid_and_complete() {
        let grid = SheetGrid::from_config(&default_grid_cells()).unwrap();
        for panel in PANEL_ORDER {
            assert!(grid.cell(panel).is_some(), "{} has no cell", panel);
        }
    }

    #[test]
    fn test_alternate_spellings_accepted() {
        let cells = vec![GridCellConfig { panel: "North Elevation".into(), x: 0.0, y: 0.0, width: 0.5, height: 0.5 }];
        let grid = SheetGrid::from_config(&cells).unwrap();
        assert!(grid.cell(PanelType::ElevationNorth).is_some());
    }

    #[test]
    fn test_invalid_grids_rejected() {
        let overlapping = vec![
            cell(PanelType::Hero3d, 0.0, 0.0, 0.6, 0.5),
            cell(PanelType::Axonometric3d, 0.5, 0.0, 0.5, 0.5),
        ];
        assert!(matches!(SheetGrid::from_config(&overlapping), Err(ConfigError::Grid(_))));
        let outside = vec![cell(PanelType::Hero3d, 0.7, 0.0, 0.5, 0.5)];
        assert!(SheetGrid::from_config(&outside).is_err());
        let unknown = vec![GridCellConfig { panel: "roof_plan".into(), x: 0.0, y: 0.0, width: 0.1, height: 0.1 }];
        assert!(SheetGrid::from_config(&unknown).is_err());
    }

    #[test]
    fn test_pixel_cells_do_not_overlap() {
        let grid = SheetGrid::from_config(&default_grid_cells()).unwrap();
        let rects: Vec<PixelRect> = grid.panels().filter_map(|p| grid.cell_px(p, 4967, 3508)).collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.overlaps(b));
            }
        }
    }
}
