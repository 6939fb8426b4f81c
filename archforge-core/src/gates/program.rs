//! Program Compliance Gate - areas, levels and adjacencies against the lock.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use super::{enforce, Gate, GateError, GateMode, ValidationReport, Violation};
use crate::config::GateConfig;
use crate::geometry::{AdjacencyReport, RealizedRoom};
use crate::hashing::short_hash;
use crate::spec::{AdjacencyPriority, Program};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedSpace {
    pub id: String,
    pub name: String,
    pub locked_level: usize,
    pub target_area_m2: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyRequirement {
    pub a: String,
    pub b: String,
    pub priority: AdjacencyPriority,
}

/// Authoritative rooms, areas and adjacencies a design must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramLock {
    pub level_count: usize,
    pub spaces: Vec<LockedSpace>,
    pub adjacency_requirements: Vec<AdjacencyRequirement>,
}

impl ProgramLock {
    pub fn from_program(program: &Program) -> Self {
        let spaces = program
            .rooms
            .iter()
            .enumerate()
            .map(|(i, r)| LockedSpace {
                id: format!("S{:02}", i + 1),
                name: r.name.clone(),
                locked_level: r.floor,
                target_area_m2: r.area_m2,
            })
            .collect();
        let adjacency_requirements = program
            .adjacency
            .iter()
            .map(|a| AdjacencyRequirement { a: a.a.clone(), b: a.b.clone(), priority: a.priority })
            .collect();
        Self { level_count: program.floors.max(1), spaces, adjacency_requirements }
    }

    pub fn program_hash(&self) -> Result<String, serde_json::Error> {
        short_hash(self)
    }

    pub fn space(&self, name: &str) -> Option<&LockedSpace> {
        self.spaces.iter().find(|s| s.name == name)
    }
}

fn pair_subject(a: &str, b: &str) -> String {
    format!("{} <-> {}", a, b)
}

fn adjacency_violations(lock: &ProgramLock, report: &AdjacencyReport) -> Vec<Violation> {
    let mut violations = vec![];
    for req in &lock.adjacency_requirements {
        if report.are_adjacent(&req.a, &req.b) {
            continue;
        }
        let actual = report
            .pair(&req.a, &req.b)
            .map(|p| format!("{:.2} m shared wall", p.shared_length_m))
            .unwrap_or_else(|| "rooms on different floors".to_string());
        let expected = format!("shared wall >= {:.2} m", report.min_shared_wall_m);
        let subject = pair_subject(&req.a, &req.b);
        let violation = match req.priority {
            AdjacencyPriority::Required => Violation::error(
                "required_adjacency",
                subject,
                format!("{} and {} must share a wall", req.a, req.b),
            )
            .remediation(format!("Place {} next to {} on the same floor", req.a, req.b)),
            AdjacencyPriority::Preferred => Violation::warning(
                "preferred_adjacency",
                subject,
                format!("{} and {} should share a wall", req.a, req.b),
            ),
        };
        violations.push(violation.expected(expected, actual));
    }
    violations
}

/// Check only the lock's adjacency requirements against a report.
pub fn validate_adjacency(lock: &ProgramLock, report: &AdjacencyReport) -> ValidationReport {
    let violations = adjacency_violations(lock, report);
    let mut metadata = Map::new();
    metadata.insert("requirements".into(), json!(lock.adjacency_requirements.len()));
    ValidationReport::new(Gate::ProgramCompliance, violations, metadata)
}

pub fn check_program(
    lock: &ProgramLock,
    realized: &[RealizedRoom],
    adjacency: &AdjacencyReport,
    area_tolerance: f64,
) -> ValidationReport {
    let mut violations = vec![];
    let mut max_deviation: f64 = 0.0;

    for space in &lock.spaces {
        let Some(room) = realized.iter().find(|r| r.name == space.name) else {
            violations.push(
                Violation::error("missing_room", &space.name, format!("{} was not realized", space.name))
                    .remediation("Add the room to the layout"),
            );
            continue;
        };

        if space.target_area_m2 > 0.0 {
            let deviation = (room.area_m2 - space.target_area_m2).abs() / space.target_area_m2;
            max_deviation = max_deviation.max(deviation);
            if deviation > area_tolerance {
                violations.push(
                    Violation::error(
                        "area_tolerance",
                        &space.name,
                        format!("{} area off target by {:.1}%", space.name, deviation * 100.0),
                    )
                    .expected(
                        format!("{:.2} m2 +/- {:.1}%", space.target_area_m2, area_tolerance * 100.0),
                        format!("{:.2} m2", room.area_m2),
                    )
                    .remediation("Resize the room or enlarge the envelope"),
                );
            }
        }

        if room.level != space.locked_level {
            violations.push(
                Violation::error("locked_level", &space.name, format!("{} placed on the wrong level", space.name))
                    .expected(format!("level {}", space.locked_level), format!("level {}", room.level)),
            );
        }
    }

    for room in realized {
        if lock.space(&room.name).is_none() {
            violations.push(Violation::error(
                "unknown_room",
                &room.name,
                format!("{} is not part of the program", room.name),
            ));
        }
    }

    violations.extend(adjacency_violations(lock, adjacency));

    let mut metadata = Map::new();
    metadata.insert("rooms_checked".into(), json!(lock.spaces.len()));
    metadata.insert("max_area_deviation".into(), json!(max_deviation));
    metadata.insert("area_tolerance".into(), json!(area_tolerance));
    ValidationReport::new(Gate::ProgramCompliance, violations, metadata)
}

pub fn program_compliance_gate(
    lock: &ProgramLock,
    realized: &[RealizedRoom],
    adjacency: &AdjacencyReport,
    config: &GateConfig,
) -> Result<ValidationReport, GateError> {
    enforce(config.mode, check_program(lock, realized, adjacency, config.area_tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{AdjacencyPair, BuildingModel};
    use crate::geometry::tests::three_room_spec;

    fn lock() -> ProgramLock {
        ProgramLock::from_program(&three_room_spec().program)
    }

    fn realized(living: f64) -> Vec<RealizedRoom> {
        vec![
            RealizedRoom { name: "Living".into(), level: 0, area_m2: living },
            RealizedRoom { name: "Kitchen".into(), level: 0, area_m2: 15.0 },
            RealizedRoom { name: "Hallway".into(), level: 0, area_m2: 8.0 },
        ]
    }

    fn empty_report() -> AdjacencyReport {
        AdjacencyReport::from_pairs(0.9, vec![])
    }

    #[test]
    fn test_lock_assigns_space_ids() {
        let lock = lock();
        assert_eq!(lock.level_count, 1);
        assert_eq!(lock.spaces[0].id, "S01");
        assert_eq!(lock.space("Hallway").map(|s| s.target_area_m2), Some(8.0));
        assert_eq!(lock.program_hash().unwrap().len(), 16);
    }

    #[test]
    fn test_area_within_tolerance_passes() {
        let report = check_program(&lock(), &realized(25.5), &empty_report(), 0.03);
        assert!(report.valid, "{:?}", report.violations);
    }

    #[test]
    fn test_area_over_tolerance_fails() {
        let report = check_program(&lock(), &realized(30.0), &empty_report(), 0.03);
        assert!(!report.valid);
        assert_eq!(report.failing_subjects(), vec!["Living".to_string()]);
    }

    #[test]
    fn test_missing_and_unknown_rooms() {
        let mut rooms = realized(25.0);
        rooms.remove(2);
        rooms.push(RealizedRoom { name: "Garage".into(), level: 0, area_m2: 18.0 });
        let report = check_program(&lock(), &rooms, &empty_report(), 0.03);
        let rules: Vec<_> = report.errors().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules, vec!["missing_room", "unknown_room"]);
    }

    #[test]
    fn test_wrong_level_fails() {
        let mut rooms = realized(25.0);
        rooms[1].level = 1;
        let report = check_program(&lock(), &rooms, &empty_report(), 0.03);
        assert_eq!(report.errors().next().map(|v| v.rule.as_str()), Some("locked_level"));
    }

    #[test]
    fn test_required_adjacency_fails_preferred_warns() {
        let mut lock = lock();
        lock.adjacency_requirements = vec![
            AdjacencyRequirement { a: "Kitchen".into(), b: "Hallway".into(), priority: AdjacencyPriority::Required },
            AdjacencyRequirement { a: "Living".into(), b: "Hallway".into(), priority: AdjacencyPriority::Preferred },
        ];
        let pairs = vec![AdjacencyPair {
            room_a: "Kitchen".into(),
            room_b: "Hallway".into(),
            floor: 0,
            adjacent: false,
            shared_length_m: 0.0,
            score: 0.0,
        }];
        let report = validate_adjacency(&lock, &AdjacencyReport::from_pairs(0.9, pairs));
        assert!(!report.valid);
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.warnings().count(), 1);
        let error = report.errors().next().unwrap();
        assert!(error.message.contains("Kitchen") && error.message.contains("Hallway"));

        lock.adjacency_requirements.remove(0);
        let only_preferred = validate_adjacency(&lock, &empty_report());
        assert!(only_preferred.valid);
    }

    #[test]
    fn test_gate_mode_controls_error() {
        let mut config = GateConfig::default();
        let model = BuildingModel::build(&three_room_spec(), None).unwrap();
        let adjacency = model.adjacency_report();
        assert!(program_compliance_gate(&lock(), &realized(30.0), &adjacency, &config).is_err());
        config.mode = GateMode::Report;
        let report = program_compliance_gate(&lock(), &realized(30.0), &adjacency, &config).unwrap();
        assert!(!report.valid);
    }
}
