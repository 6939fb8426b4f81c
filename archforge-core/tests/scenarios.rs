//! End-to-end scenarios for the consistency pipeline.

use image::{ImageFormat, Rgb, RgbImage};
use serde_json::json;
use std::io::Cursor;

use archforge_core::{
    build_canonical_pack, compose_sheet, derive_seeds,
    config::SheetConfig,
    gates::{check_compose, check_program, validate_adjacency, AdjacencyRequirement, ComposeInput, ComposeStamp, ProgramLock},
    generation::{PanelResult, RunIdentity},
    geometry::{AdjacencyPair, AdjacencyReport, RealizedRoom},
    normalize,
    panels::PanelType,
    sheet::{default_grid_cells, SheetGrid, SheetPanel},
    spec::{AdjacencyPriority, Specification},
    BuildingModel, ImageRef,
};

fn three_rooms() -> Specification {
    normalize(&json!({
        "program": {
            "floors": 1,
            "rooms": [
                {"name": "Living", "area": 25},
                {"name": "Kitchen", "area": 15},
                {"name": "Hallway", "area": 8}
            ],
            "adjacency": [{"a": "Kitchen", "b": "Hallway", "priority": "required"}]
        }
    }))
    .spec
}

fn png(width: u32, height: u32, shade: u8) -> ImageRef {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if x > 2 && y > 2 && x < width - 3 && y < height - 3 {
            Rgb([shade, 40, 90])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
    ImageRef::inline(out)
}

#[test]
fn scenario_seed_sequence_for_four_panels() {
    let panels = [PanelType::FloorPlanGround, PanelType::ElevationNorth, PanelType::SectionAA, PanelType::Hero3d];
    let seeds: Vec<u32> = derive_seeds(12345, &panels).into_iter().map(|s| s.seed).collect();
    assert_eq!(seeds, vec![12345, 12482, 12619, 12756]);
}

#[test]
fn scenario_identical_specs_give_identical_pack_hashes() {
    let spec = three_rooms();
    let first = build_canonical_pack(&BuildingModel::build(&spec, None).unwrap()).unwrap();
    let second = build_canonical_pack(&BuildingModel::build(&spec.clone(), None).unwrap()).unwrap();
    assert_eq!(first.geometry_hash.len(), 16);
    assert_eq!(first.geometry_hash, second.geometry_hash);
    assert!(first.is_complete());
}

#[test]
fn scenario_mismatched_panel_hash_rejected_by_compose_gate() {
    let required = [PanelType::FloorPlanGround, PanelType::ElevationNorth, PanelType::SectionAA, PanelType::Hero3d];
    let current = RunIdentity { spec_hash: "spec".into(), geometry_hash: "geom".into() };
    let stale = RunIdentity { spec_hash: "spec".into(), geometry_hash: "older".into() };
    let results: Vec<PanelResult> = required
        .iter()
        .map(|&p| {
            let identity = if p == PanelType::ElevationNorth { &stale } else { &current };
            PanelResult::succeeded(p, 1, ImageRef::inline(vec![]), identity)
        })
        .collect();

    let outcome = check_compose(&ComposeInput {
        spec_hash: "spec",
        geometry_hash: "geom",
        program_hash: "prog",
        required: &required,
        results: &results,
    });
    assert!(!outcome.report.valid);
    assert_eq!(outcome.report.failing_subjects(), vec!["elevation_north".to_string()]);
}

#[test]
fn scenario_area_tolerance_three_percent() {
    let lock = ProgramLock::from_program(&three_rooms().program);
    let realized = |living: f64| {
        vec![
            RealizedRoom { name: "Living".into(), level: 0, area_m2: living },
            RealizedRoom { name: "Kitchen".into(), level: 0, area_m2: 15.0 },
            RealizedRoom { name: "Hallway".into(), level: 0, area_m2: 8.0 },
        ]
    };
    let adjacent = AdjacencyReport::from_pairs(
        0.9,
        vec![AdjacencyPair {
            room_a: "Kitchen".into(),
            room_b: "Hallway".into(),
            floor: 0,
            adjacent: true,
            shared_length_m: 3.0,
            score: 1.0,
        }],
    );

    assert!(check_program(&lock, &realized(25.5), &adjacent, 0.03).valid);
    let over = check_program(&lock, &realized(30.0), &adjacent, 0.03);
    assert!(!over.valid);
    assert_eq!(over.failing_subjects(), vec!["Living".to_string()]);
}

#[test]
fn scenario_required_adjacency_violation_names_both_rooms() {
    let lock = ProgramLock::from_program(&three_rooms().program);
    assert_eq!(
        lock.adjacency_requirements,
        vec![AdjacencyRequirement { a: "Kitchen".into(), b: "Hallway".into(), priority: AdjacencyPriority::Required }]
    );
    let apart = AdjacencyReport::from_pairs(
        0.9,
        vec![AdjacencyPair {
            room_a: "Kitchen".into(),
            room_b: "Hallway".into(),
            floor: 0,
            adjacent: false,
            shared_length_m: 0.0,
            score: 0.0,
        }],
    );
    let report = validate_adjacency(&lock, &apart);
    assert!(!report.valid);
    let violation = report.errors().next().unwrap();
    assert!(violation.message.contains("Kitchen"));
    assert!(violation.message.contains("Hallway"));
}

#[test]
fn scenario_layout_resolves_required_adjacency() {
    let spec = normalize(&json!({
        "program": {
            "floors": 1,
            "rooms": [
                {"name": "A", "area": 30},
                {"name": "B", "area": 20},
                {"name": "C", "area": 15},
                {"name": "D", "area": 10}
            ],
            "adjacency": [{"a": "A", "b": "D", "priority": "required"}]
        }
    }))
    .spec;
    let model = BuildingModel::build(&spec, None).unwrap();
    let adjacency = model.adjacency_report();
    assert!(adjacency.are_adjacent("A", "D"));

    let lock = ProgramLock::from_program(&spec.program);
    let report = check_program(&lock, &model.realized_program(), &adjacency, 0.03);
    assert!(report.valid, "{:?}", report.failing_subjects());
}

#[test]
fn scenario_four_panels_compose_onto_configured_sheet() {
    let config = SheetConfig { width: 1200, height: 840, ..SheetConfig::default() };
    let grid = SheetGrid::from_config(&config.grid).unwrap();
    let required = [PanelType::FloorPlanGround, PanelType::ElevationNorth, PanelType::SectionAA, PanelType::Hero3d];
    let panels: Vec<SheetPanel> = [
        ("floor_plan_ground", 320, 240),
        ("North Elevation", 320, 180),
        ("section-a-a", 320, 180),
        ("hero", 512, 320),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (key, w, h))| SheetPanel::new(key, png(w, h, 40 * i as u8)))
    .collect();
    let stamp = ComposeStamp { geometry_hash: "geom".into(), spec_hash: "spec".into(), program_hash: "prog".into() };

    let sheet = compose_sheet(&panels, &grid, &required, None, &stamp, &config).unwrap();

    let decoded = image::load_from_memory(&sheet.png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1200, 840));
    let placements = &sheet.metadata.placements;
    assert_eq!(placements.len(), 4);
    for (i, a) in placements.iter().enumerate() {
        for b in &placements[i + 1..] {
            assert!(!a.image.overlaps(&b.image), "{} overlaps {}", a.panel, b.panel);
        }
    }
    assert!(sheet.metadata.excluded.is_empty());
    assert_eq!(sheet.metadata.geometry_hash, "geom");
    assert_eq!(default_grid_cells().len(), 11);
}
