//! Section planning: turns aggregate subject demand into a target section
//! count per subject and builds concrete sections from the catalog's
//! instructor and room pools.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use types::{Catalog, InstructorId, Section, SlotPattern, StudentRequests, Subject};

/// How many students each request is worth one section slice of. Thin
/// populations get a smaller divisor so per-subject demand still yields
/// enough parallel sections.
pub fn divisor(total_students: usize) -> u32 {
    if total_students <= 120 {
        8
    } else {
        12
    }
}

pub fn demand(requests: &StudentRequests) -> BTreeMap<Subject, u32> {
    let mut counts = BTreeMap::new();
    for subjects in requests.values() {
        for subject in subjects {
            *counts.entry(subject.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Target section counts: at least two sections per requested subject.
pub fn initial_plan(
    demand: &BTreeMap<Subject, u32>,
    total_students: usize,
) -> BTreeMap<Subject, u32> {
    let div = divisor(total_students);
    demand
        .iter()
        .map(|(subject, &count)| (subject.clone(), count.div_ceil(div).max(2)))
        .collect()
}

/// Ceiling on how far the retry loop may grow one subject's section count.
pub fn plan_cap(demand: u32) -> u32 {
    (demand.div_ceil(3) + 6).max(6)
}

/// Builds the attempt's sections. Subjects with no qualified instructor or
/// no usable room are skipped entirely; students requesting them will fail
/// at enrollment. Instructors are picked least-loaded-first per subject,
/// rooms uniformly at random from the eligible pool.
pub fn build_sections(
    catalog: &Catalog,
    demand: &BTreeMap<Subject, u32>,
    plan: &BTreeMap<Subject, u32>,
    rng: &mut ChaCha8Rng,
) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut teacher_load: HashMap<(InstructorId, Subject), u32> = HashMap::new();

    for subject in demand.keys() {
        let qualified = catalog.qualified_instructors(subject);
        if qualified.is_empty() {
            continue;
        }
        let rooms = catalog.eligible_rooms(subject);
        if rooms.is_empty() {
            continue;
        }

        let target = plan.get(subject).copied().unwrap_or(2);
        let prefix = subject.abbrev();

        for seq in 1..=target {
            let mut ranked = qualified.clone();
            ranked.sort_by_key(|t| {
                teacher_load
                    .get(&(t.name.clone(), subject.clone()))
                    .copied()
                    .unwrap_or(0)
            });
            let instructor = ranked[0].clone();
            *teacher_load
                .entry((instructor.name.clone(), subject.clone()))
                .or_insert(0) += 1;

            let room = rooms[rng.gen_range(0..rooms.len())].clone();

            sections.push(Section {
                id: format!("{prefix}-{seq}"),
                subject: subject.clone(),
                instructor,
                room,
                pattern: SlotPattern::default(),
                roster: Vec::new(),
            });
        }
    }

    sections
}
