//! Greedy, cost-minimizing pattern assignment. Sections of a subject are
//! handled consecutively so their accumulated usage steers later siblings
//! away from the same slots.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use types::{InstructorId, RoomId, Section, Slot, SlotPattern, Subject};

/// Per prior use of a slot by any assigned section.
const SLOT_PRESSURE: u64 = 1_000;
/// A slot where this section's own instructor or room is already committed.
/// Dominant on purpose: any conflict-free pattern in the pool beats every
/// conflicted one.
const HARD_CONFLICT: u64 = 100_000;
/// Per prior use of this exact pattern anywhere.
const PATTERN_REUSE: u64 = 2_500;
/// Extra reuse pressure when the subject has a single section.
const SINGLETON_REUSE: u64 = 9_000;
/// Flat surcharge for handing a singleton subject an extended pattern.
const SINGLETON_EXTENDED: u64 = 5_000;

#[derive(Default)]
struct Usage {
    slots: HashMap<Slot, u64>,
    instructors: HashSet<(InstructorId, Slot)>,
    rooms: HashSet<(RoomId, Slot)>,
    patterns: HashMap<SlotPattern, u64>,
}

impl Usage {
    fn commit(&mut self, sec: &Section) {
        for &slot in sec.pattern.slots() {
            *self.slots.entry(slot).or_insert(0) += 1;
            self.instructors.insert((sec.instructor.name.clone(), slot));
            self.rooms.insert((sec.room.id.clone(), slot));
        }
        *self.patterns.entry(sec.pattern.clone()).or_insert(0) += 1;
    }
}

pub fn assign_patterns(
    sections: &mut [Section],
    pool: &mut Vec<SlotPattern>,
    rng: &mut ChaCha8Rng,
) {
    let mut subject_order: Vec<Subject> = Vec::new();
    let mut by_subject: HashMap<Subject, Vec<usize>> = HashMap::new();
    for (i, sec) in sections.iter().enumerate() {
        let group = by_subject.entry(sec.subject.clone()).or_default();
        if group.is_empty() {
            subject_order.push(sec.subject.clone());
        }
        group.push(i);
    }

    let mut usage = Usage::default();

    for subject in &subject_order {
        let group = &by_subject[subject];
        let singleton = group.len() == 1;
        for &i in group {
            pool.shuffle(rng);

            let mut best: Option<(u64, usize)> = None;
            for (pi, pattern) in pool.iter().enumerate() {
                let cost = pattern_cost(pattern, &sections[i], singleton, &usage);
                if best.map_or(true, |(c, _)| cost < c) {
                    best = Some((cost, pi));
                }
            }
            let Some((_, pi)) = best else {
                continue;
            };

            sections[i].pattern = pool[pi].clone();
            usage.commit(&sections[i]);
        }
    }
}

fn pattern_cost(pattern: &SlotPattern, sec: &Section, singleton: bool, usage: &Usage) -> u64 {
    let reuse = usage.patterns.get(pattern).copied().unwrap_or(0);

    let mut cost = 0u64;
    for &slot in pattern.slots() {
        cost += usage.slots.get(&slot).copied().unwrap_or(0) * SLOT_PRESSURE;
        if usage
            .instructors
            .contains(&(sec.instructor.name.clone(), slot))
        {
            cost += HARD_CONFLICT;
        }
        if usage.rooms.contains(&(sec.room.id.clone(), slot)) {
            cost += HARD_CONFLICT;
        }
    }

    cost += reuse * PATTERN_REUSE;
    if singleton {
        cost += reuse * SINGLETON_REUSE;
        if pattern.is_extended() {
            cost += SINGLETON_EXTENDED;
        }
    }
    cost
}
