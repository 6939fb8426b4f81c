//! Inter-call delays keyed by (previous category, next category).

use std::time::Duration;

use crate::config::GenerationConfig;
use crate::panels::PanelCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayTable {
    pub technical_to_technical: Duration,
    pub technical_to_render: Duration,
    pub render_to_technical: Duration,
    pub render_to_render: Duration,
}

impl From<&GenerationConfig> for DelayTable {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            technical_to_technical: Duration::from_millis(config.technical_to_technical_ms),
            technical_to_render: Duration::from_millis(config.technical_to_render_ms),
            render_to_technical: Duration::from_millis(config.render_to_technical_ms),
            render_to_render: Duration::from_millis(config.render_to_render_ms),
        }
    }
}

impl DelayTable {
    /// Wait before submitting `next`; the first call of a run has none.
    pub fn between(&self, previous: Option<PanelCategory>, next: PanelCategory) -> Duration {
        use PanelCategory::{Render3d, TechnicalDrawing};
        match (previous, next) {
            (None, _) => Duration::ZERO,
            (Some(TechnicalDrawing), TechnicalDrawing) => self.technical_to_technical,
            (Some(TechnicalDrawing), Render3d) => self.technical_to_render,
            (Some(Render3d), TechnicalDrawing) => self.render_to_technical,
            (Some(Render3d), Render3d) => self.render_to_render,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_into_renders_are_longer() {
        let table = DelayTable::from(&GenerationConfig::default());
        let tt = table.between(Some(PanelCategory::TechnicalDrawing), PanelCategory::TechnicalDrawing);
        let tr = table.between(Some(PanelCategory::TechnicalDrawing), PanelCategory::Render3d);
        let rr = table.between(Some(PanelCategory::Render3d), PanelCategory::Render3d);
        assert!(tt < tr && tr < rr);
        assert_eq!(table.between(None, PanelCategory::Render3d), Duration::ZERO);
    }
}
