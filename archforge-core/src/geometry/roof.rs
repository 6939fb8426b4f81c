//! Roof massing and per-facade silhouettes.
//!
//! The ridge runs along the longer plan axis. Mono-pitch roofs rise towards
//! north (east-west ridge) or east (north-south ridge).

use serde::{Deserialize, Serialize};

use super::{Envelope, Facade};
use crate::spec::RoofType;

const PARAPET_M: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RidgeAxis {
    EastWest,
    NorthSouth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roof {
    pub roof_type: RoofType,
    pub pitch_deg: f64,
    pub ridge_axis: RidgeAxis,
    pub eave_height_m: f64,
    pub ridge_height_m: f64,
    pub ridge_length_m: f64,
}

/// A point on a facade drawing: `x` from the viewer's left, `z` up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    pub x: f64,
    pub z: f64,
}

/// Roof outline above the eave line as seen from one facade, left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofProfile {
    pub facade: Facade,
    pub points: Vec<ProfilePoint>,
}

impl RoofProfile {
    pub fn peak_m(&self) -> f64 {
        self.points.iter().map(|p| p.z).fold(f64::MIN, f64::max)
    }
}

fn pt(x: f64, z: f64) -> ProfilePoint {
    ProfilePoint { x, z }
}

impl Roof {
    pub(crate) fn derive(roof_type: RoofType, pitch_deg: f64, envelope: &Envelope, eave_height_m: f64) -> Self {
        let ridge_axis = if envelope.width_m >= envelope.depth_m {
            RidgeAxis::EastWest
        } else {
            RidgeAxis::NorthSouth
        };
        let (long, short) = match ridge_axis {
            RidgeAxis::EastWest => (envelope.width_m, envelope.depth_m),
            RidgeAxis::NorthSouth => (envelope.depth_m, envelope.width_m),
        };
        let slope = pitch_deg.to_radians().tan();

        let (rise, ridge_length_m) = match roof_type {
            RoofType::Flat => (PARAPET_M, long),
            RoofType::Gable => (short / 2.0 * slope, long),
            RoofType::Hip => (short / 2.0 * slope, (long - short).max(0.0)),
            RoofType::Mono => (short * slope, long),
        };

        Self {
            roof_type,
            pitch_deg,
            ridge_axis,
            eave_height_m,
            ridge_height_m: eave_height_m + rise,
            ridge_length_m,
        }
    }

    /// Whether `facade` looks along the ridge (sees the gable or hip end).
    pub fn is_end_facade(&self, facade: Facade) -> bool {
        matches!(
            (self.ridge_axis, facade),
            (RidgeAxis::EastWest, Facade::East | Facade::West)
                | (RidgeAxis::NorthSouth, Facade::North | Facade::South)
        )
    }

    pub(crate) fn profile(&self, facade: Facade, envelope: &Envelope) -> RoofProfile {
        let len = envelope.facade_length(facade);
        let eave = self.eave_height_m;
        let top = self.ridge_height_m;
        let end = self.is_end_facade(facade);

        let points = match self.roof_type {
            RoofType::Flat => vec![pt(0.0, eave), pt(0.0, top), pt(len, top), pt(len, eave)],
            RoofType::Gable if end => vec![pt(0.0, eave), pt(len / 2.0, top), pt(len, eave)],
            RoofType::Gable => vec![pt(0.0, eave), pt(0.0, top), pt(len, top), pt(len, eave)],
            RoofType::Hip if end => vec![pt(0.0, eave), pt(len / 2.0, top), pt(len, eave)],
            RoofType::Hip => {
                let inset = (len - self.ridge_length_m) / 2.0;
                vec![pt(0.0, eave), pt(inset, top), pt(len - inset, top), pt(len, eave)]
            }
            RoofType::Mono if end => {
                if self.high_side_on_right(facade) {
                    vec![pt(0.0, eave), pt(len, top), pt(len, eave)]
                } else {
                    vec![pt(0.0, eave), pt(0.0, top), pt(len, eave)]
                }
            }
            RoofType::Mono => vec![pt(0.0, eave), pt(0.0, top), pt(len, top), pt(len, eave)],
        };
        RoofProfile { facade, points }
    }

    // East facade reads south-to-north, west reads north-to-south, north
    // reads east-to-west, south reads west-to-east.
    fn high_side_on_right(&self, facade: Facade) -> bool {
        match (self.ridge_axis, facade) {
            (RidgeAxis::EastWest, Facade::East) => true,
            (RidgeAxis::EastWest, _) => false,
            (RidgeAxis::NorthSouth, Facade::South) => true,
            (RidgeAxis::NorthSouth, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV: Envelope = Envelope { width_m: 12.0, depth_m: 8.0 };

    #[test]
    fn test_gable_ends_are_triangles() {
        let roof = Roof::derive(RoofType::Gable, 45.0, &ENV, 6.0);
        assert_eq!(roof.ridge_axis, RidgeAxis::EastWest);
        assert!((roof.ridge_height_m - 10.0).abs() < 1e-9);

        let east = roof.profile(Facade::East, &ENV);
        assert_eq!(east.points.len(), 3);
        assert!((east.points[1].x - 4.0).abs() < 1e-9);

        let south = roof.profile(Facade::South, &ENV);
        assert_eq!(south.points.len(), 4);
        assert_eq!(south.points[2].x, 12.0);
    }

    #[test]
    fn test_hip_ridge_shorter_than_building() {
        let roof = Roof::derive(RoofType::Hip, 45.0, &ENV, 3.0);
        assert!((roof.ridge_length_m - 4.0).abs() < 1e-9);
        let north = roof.profile(Facade::North, &ENV);
        assert!((north.points[1].x - 4.0).abs() < 1e-9);
        assert!((north.points[2].x - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_roof_has_parapet() {
        let roof = Roof::derive(RoofType::Flat, 0.0, &ENV, 3.0);
        assert!((roof.profile(Facade::West, &ENV).peak_m() - 3.3).abs() < 1e-9);
    }

    #[test]
    fn test_mono_rises_to_north() {
        let roof = Roof::derive(RoofType::Mono, 20.0, &ENV, 3.0);
        let east = roof.profile(Facade::East, &ENV);
        let west = roof.profile(Facade::West, &ENV);
        // East facade has north on the right, west facade on the left.
        assert_eq!(east.points[1].x, 8.0);
        assert_eq!(west.points[1].x, 0.0);
        assert_eq!(east.peak_m(), west.peak_m());
    }
}
