//! Hard-constraint audit over a finished timetable. The solver is expected
//! to produce a clean audit; report collaborators surface anything found
//! here as a defect rather than a scheduling failure.

use std::collections::{BTreeMap, HashMap};
use types::{Cell, ScheduleGrid, Section, Slot, StudentId, Violation};

pub fn audit(
    sections: &[Section],
    schedules: &BTreeMap<StudentId, Option<ScheduleGrid>>,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    let mut instructor_at: HashMap<(&str, Slot), &str> = HashMap::new();
    let mut room_at: HashMap<(&str, Slot), &str> = HashMap::new();

    for sec in sections {
        for &slot in sec.pattern.slots() {
            if let Some(other) =
                instructor_at.insert((sec.instructor.name.0.as_str(), slot), sec.id.as_str())
            {
                violations.push(Violation {
                    kind: "instructor_clash".into(),
                    details: serde_json::json!({
                        "instructor": sec.instructor.name.0,
                        "slot": slot.to_string(),
                        "sections": [other, sec.id],
                    }),
                });
            }
            if let Some(other) = room_at.insert((sec.room.id.0.as_str(), slot), sec.id.as_str()) {
                violations.push(Violation {
                    kind: "room_clash".into(),
                    details: serde_json::json!({
                        "room": sec.room.id.0,
                        "slot": slot.to_string(),
                        "sections": [other, sec.id],
                    }),
                });
            }
        }

        if sec.roster.len() as u32 > sec.room.capacity {
            violations.push(Violation {
                kind: "over_capacity".into(),
                details: serde_json::json!({
                    "section": sec.id,
                    "roster": sec.roster.len(),
                    "capacity": sec.room.capacity,
                }),
            });
        }

        for student in &sec.roster {
            let grid = match schedules.get(student) {
                Some(Some(grid)) => grid,
                _ => {
                    violations.push(Violation {
                        kind: "roster_without_schedule".into(),
                        details: serde_json::json!({
                            "section": sec.id,
                            "student": student.0,
                        }),
                    });
                    continue;
                }
            };
            for &slot in sec.pattern.slots() {
                let matches = matches!(
                    grid.cell(slot),
                    Cell::Class { subject, room }
                        if *subject == sec.subject && *room == sec.room.id
                );
                if !matches {
                    violations.push(Violation {
                        kind: "grid_mismatch".into(),
                        details: serde_json::json!({
                            "section": sec.id,
                            "student": student.0,
                            "slot": slot.to_string(),
                        }),
                    });
                }
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use types::{
        Day, Instructor, InstructorId, Room, RoomId, RoomKind, SlotPattern, Subject,
    };

    fn section(id: &str, subject: &str, instructor: &Arc<Instructor>, room: &Arc<Room>) -> Section {
        Section {
            id: id.into(),
            subject: Subject::from(subject),
            instructor: instructor.clone(),
            room: room.clone(),
            pattern: SlotPattern::default(),
            roster: vec![],
        }
    }

    #[test]
    fn shared_instructor_on_overlapping_patterns_is_flagged() {
        let teacher = Arc::new(Instructor {
            name: InstructorId::from("Mr Kent"),
            subjects: vec![Subject::from("Maths"), Subject::from("Physics")],
        });
        let room_a = Arc::new(Room {
            id: RoomId::from("A"),
            kind: RoomKind::General,
            capacity: 30,
            preferred_subjects: vec![],
        });
        let room_b = Arc::new(Room {
            id: RoomId::from("B"),
            kind: RoomKind::General,
            capacity: 30,
            preferred_subjects: vec![],
        });

        let mut one = section("Maths-1", "Maths", &teacher, &room_a);
        one.pattern = SlotPattern(vec![Slot::new(Day::Mon, 2)]);
        let mut two = section("Physi-1", "Physics", &teacher, &room_b);
        two.pattern = SlotPattern(vec![Slot::new(Day::Mon, 2)]);

        let violations = audit(&[one, two], &BTreeMap::new());
        assert!(violations.iter().any(|v| v.kind == "instructor_clash"));
        assert!(!violations.iter().any(|v| v.kind == "room_clash"));
    }

    #[test]
    fn over_capacity_roster_is_flagged() {
        let teacher = Arc::new(Instructor {
            name: InstructorId::from("Mr Kent"),
            subjects: vec![Subject::from("Maths")],
        });
        let room = Arc::new(Room {
            id: RoomId::from("A"),
            kind: RoomKind::General,
            capacity: 1,
            preferred_subjects: vec![],
        });
        let mut sec = section("Maths-1", "Maths", &teacher, &room);
        sec.roster = vec![StudentId::from("s1"), StudentId::from("s2")];

        // No grids supplied: expect over_capacity plus roster_without_schedule.
        let violations = audit(&[sec], &BTreeMap::new());
        assert!(violations.iter().any(|v| v.kind == "over_capacity"));
    }
}
