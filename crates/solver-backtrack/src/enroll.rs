//! Student enrollment: per student, a depth-first search over candidate
//! sections, one subject per depth, with an explicit undo record per
//! decision instead of call-stack recursion.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use types::{
    Cell, Day, FailedRequest, ScheduleGrid, Section, Slot, StudentId, StudentRequests, Subject,
};

pub struct EnrollOutcome {
    pub schedules: BTreeMap<StudentId, Option<ScheduleGrid>>,
    pub failed: Vec<FailedRequest>,
}

pub fn enroll_students(
    sections: &mut [Section],
    requests: &StudentRequests,
    rng: &mut ChaCha8Rng,
) -> EnrollOutcome {
    for sec in sections.iter_mut() {
        sec.roster.clear();
    }

    let difficulty = subject_difficulty(sections, requests);

    let mut schedules = BTreeMap::new();
    let mut failed = Vec::new();

    // BTreeMap iteration gives the stable name order.
    for (student, subjects) in requests {
        let mut ordered = subjects.clone();
        ordered.sort_by(|a, b| {
            let da = difficulty.get(a).copied().unwrap_or(0.0);
            let db = difficulty.get(b).copied().unwrap_or(0.0);
            db.total_cmp(&da)
        });

        match place_student(student, &ordered, sections, rng) {
            Ok(grid) => {
                schedules.insert(student.clone(), Some(grid));
            }
            Err(failed_at) => {
                schedules.insert(student.clone(), None);
                failed.push(FailedRequest {
                    student: student.clone(),
                    failed_at,
                    requested: ordered,
                });
            }
        }
    }

    EnrollOutcome { schedules, failed }
}

/// Scarcer subjects rank harder so they are tried, and can fail, early.
fn subject_difficulty(
    sections: &[Section],
    requests: &StudentRequests,
) -> HashMap<Subject, f64> {
    let mut section_counts: HashMap<&Subject, usize> = HashMap::new();
    for sec in sections {
        *section_counts.entry(&sec.subject).or_insert(0) += 1;
    }

    let mut difficulty = HashMap::new();
    for subjects in requests.values() {
        for subject in subjects {
            let score = match section_counts.get(subject) {
                Some(&n) => 100.0 / n as f64,
                None => 999.0,
            };
            difficulty.insert(subject.clone(), score);
        }
    }
    difficulty
}

/// One depth of the search: the shuffled candidate sections for a subject,
/// a cursor into them, and the section currently holding this student.
struct Frame {
    candidates: Vec<usize>,
    cursor: usize,
    placed: Option<usize>,
}

impl Frame {
    fn new(subject: &Subject, sections: &[Section], rng: &mut ChaCha8Rng) -> Self {
        let mut candidates: Vec<usize> = sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.subject == *subject)
            .map(|(i, _)| i)
            .collect();
        candidates.shuffle(rng);
        Frame {
            candidates,
            cursor: 0,
            placed: None,
        }
    }
}

/// On failure every placement has been retracted and the grid is dropped;
/// the returned subject is the hardest-ranked one, which is where the
/// search as a whole gave up.
fn place_student(
    student: &StudentId,
    ordered: &[Subject],
    sections: &mut [Section],
    rng: &mut ChaCha8Rng,
) -> Result<ScheduleGrid, Subject> {
    let mut grid = ScheduleGrid::new();
    if ordered.is_empty() {
        return Ok(grid);
    }

    let mut stack = vec![Frame::new(&ordered[0], sections, rng)];
    while let Some(frame) = stack.last_mut() {
        if let Some(si) = frame.placed.take() {
            retract(student, si, sections, &mut grid);
        }

        let mut advanced = false;
        while frame.cursor < frame.candidates.len() {
            let si = frame.candidates[frame.cursor];
            frame.cursor += 1;
            if admissible(&sections[si], &grid) {
                place(student, si, sections, &mut grid);
                frame.placed = Some(si);
                advanced = true;
                break;
            }
        }

        if advanced {
            let depth = stack.len();
            if depth == ordered.len() {
                return Ok(grid);
            }
            let next = Frame::new(&ordered[depth], sections, rng);
            stack.push(next);
        } else {
            stack.pop();
        }
    }

    Err(ordered[0].clone())
}

fn admissible(sec: &Section, grid: &ScheduleGrid) -> bool {
    if !sec.has_space() {
        return false;
    }
    if !sec.pattern.slots().iter().all(|&slot| grid.is_free(slot)) {
        return false;
    }

    // Last-period sessions on Tue-Thu are only allowed as part of the
    // extended block anchored at Monday's last period, and that anchor must
    // not already belong to a different subject.
    let has_mon_last = sec.pattern.is_extended();
    let has_other_last = sec.pattern.slots().iter().any(|s| {
        s.day != Day::Mon && s.day != Day::Fri && s.period == s.day.last_period()
    });
    if has_other_last && !has_mon_last {
        return false;
    }
    if has_mon_last {
        let anchor = Slot::new(Day::Mon, Day::Mon.last_period());
        if let Cell::Class { subject, .. } = grid.cell(anchor) {
            if *subject != sec.subject {
                return false;
            }
        }
    }

    true
}

fn place(student: &StudentId, si: usize, sections: &mut [Section], grid: &mut ScheduleGrid) {
    let sec = &mut sections[si];
    for &slot in sec.pattern.slots() {
        grid.set(
            slot,
            Cell::Class {
                subject: sec.subject.clone(),
                room: sec.room.id.clone(),
            },
        );
    }
    sec.roster.push(student.clone());
}

fn retract(student: &StudentId, si: usize, sections: &mut [Section], grid: &mut ScheduleGrid) {
    let sec = &mut sections[si];
    if let Some(pos) = sec.roster.iter().position(|s| s == student) {
        sec.roster.remove(pos);
    }
    for &slot in sec.pattern.slots() {
        grid.clear(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use std::sync::Arc;
    use types::{Instructor, InstructorId, Room, RoomId, RoomKind, SlotPattern};

    fn section(id: &str, subject: &str, capacity: u32, slots: Vec<Slot>) -> Section {
        Section {
            id: id.into(),
            subject: Subject::from(subject),
            instructor: Arc::new(Instructor {
                name: InstructorId::from("T"),
                subjects: vec![Subject::from(subject)],
            }),
            room: Arc::new(Room {
                id: RoomId::from(id),
                kind: RoomKind::General,
                capacity,
                preferred_subjects: vec![],
            }),
            pattern: SlotPattern(slots),
            roster: Vec::new(),
        }
    }

    fn requests(entries: &[(&str, &[&str])]) -> StudentRequests {
        entries
            .iter()
            .map(|(name, subjects)| {
                (
                    StudentId::from(*name),
                    subjects.iter().map(|s| Subject::from(*s)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn single_student_fills_every_pattern_slot() {
        let mut sections = vec![section(
            "Maths-1",
            "Maths",
            20,
            vec![Slot::new(Day::Mon, 0), Slot::new(Day::Wed, 2)],
        )];
        let reqs = requests(&[("Student_1", &["Maths"])]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let out = enroll_students(&mut sections, &reqs, &mut rng);
        assert!(out.failed.is_empty());
        let grid = out.schedules[&StudentId::from("Student_1")]
            .as_ref()
            .unwrap();
        for slot in [Slot::new(Day::Mon, 0), Slot::new(Day::Wed, 2)] {
            assert!(matches!(grid.cell(slot), Cell::Class { .. }));
        }
        assert_eq!(sections[0].roster, vec![StudentId::from("Student_1")]);
    }

    #[test]
    fn backtracking_retries_the_earlier_subject() {
        // Both History sections collide with Maths-1, so whenever the
        // search leads with Maths-1 it has to back out and move to Maths-2.
        let shared = vec![Slot::new(Day::Mon, 0)];
        let mut sections = vec![
            section("Maths-1", "Maths", 20, shared.clone()),
            section("Maths-2", "Maths", 20, vec![Slot::new(Day::Tue, 2)]),
            section("Histo-1", "History", 20, shared.clone()),
            section("Histo-2", "History", 20, shared),
        ];
        let reqs = requests(&[("Student_1", &["Maths", "History"])]);

        for seed in 0..10 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let out = enroll_students(&mut sections, &reqs, &mut rng);
            assert!(out.failed.is_empty(), "seed {seed}");
            assert!(sections[0].roster.is_empty(), "seed {seed}");
            assert_eq!(sections[1].roster.len(), 1, "seed {seed}");
            let history_enrollments =
                sections[2].roster.len() + sections[3].roster.len();
            assert_eq!(history_enrollments, 1, "seed {seed}");
        }
    }

    #[test]
    fn failure_rolls_everything_back() {
        // Both subjects own a single, mutually conflicting section.
        let shared = vec![Slot::new(Day::Mon, 0)];
        let mut sections = vec![
            section("Maths-1", "Maths", 20, shared.clone()),
            section("Histo-1", "History", 20, shared),
        ];
        let reqs = requests(&[("Student_1", &["Maths", "History"])]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let out = enroll_students(&mut sections, &reqs, &mut rng);
        assert_eq!(out.failed.len(), 1);
        assert!(out.schedules[&StudentId::from("Student_1")].is_none());
        assert!(sections.iter().all(|s| s.roster.is_empty()));
        // Equal scarcity: difficulty sort is stable, so blame lands on the
        // first requested subject.
        assert_eq!(out.failed[0].failed_at, Subject::from("Maths"));
    }

    #[test]
    fn scarce_subjects_are_attempted_first() {
        let mut sections = vec![
            section("Maths-1", "Maths", 20, vec![Slot::new(Day::Mon, 0)]),
            section("Maths-2", "Maths", 20, vec![Slot::new(Day::Tue, 2)]),
            section("Histo-1", "History", 20, vec![Slot::new(Day::Wed, 3)]),
        ];
        let reqs = requests(&[("Student_1", &["Maths", "History"])]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let out = enroll_students(&mut sections, &reqs, &mut rng);
        // History has one section to Maths' two, so it leads the order the
        // failure record preserves.
        assert!(out.failed.is_empty());
        let histo_first = requests(&[("Student_2", &["Maths", "Missing"])]);
        let out = enroll_students(&mut sections, &histo_first, &mut rng);
        assert_eq!(out.failed.len(), 1);
        assert_eq!(out.failed[0].failed_at, Subject::from("Missing"));
        assert_eq!(
            out.failed[0].requested,
            vec![Subject::from("Missing"), Subject::from("Maths")]
        );
    }

    #[test]
    fn capacity_stops_enrollment() {
        let mut sections = vec![section("Maths-1", "Maths", 1, vec![Slot::new(Day::Mon, 0)])];
        let reqs = requests(&[("Student_1", &["Maths"]), ("Student_2", &["Maths"])]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let out = enroll_students(&mut sections, &reqs, &mut rng);
        assert_eq!(out.failed.len(), 1);
        assert_eq!(out.failed[0].student, StudentId::from("Student_2"));
        assert_eq!(sections[0].roster.len(), 1);
    }

    #[test]
    fn lone_last_period_sessions_are_inadmissible() {
        // Tuesday's last period without the Monday anchor.
        let sec = section("Chemi-1", "Chemistry", 20, vec![Slot::new(Day::Tue, 6)]);
        let grid = ScheduleGrid::new();
        assert!(!admissible(&sec, &grid));

        // The full extended block carries its own anchor.
        let extended = section(
            "Chemi-2",
            "Chemistry",
            20,
            vec![
                Slot::new(Day::Mon, 5),
                Slot::new(Day::Tue, 6),
                Slot::new(Day::Wed, 5),
                Slot::new(Day::Thu, 5),
            ],
        );
        assert!(admissible(&extended, &grid));
    }

    #[test]
    fn reserved_slots_block_admission() {
        let sec = section("Maths-1", "Maths", 20, vec![types::TUTORIAL_SLOT]);
        let grid = ScheduleGrid::new();
        assert!(!admissible(&sec, &grid));
    }
}
