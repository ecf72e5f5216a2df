pub mod audit;

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

pub use types::{
    Catalog, FailedRequest, ScheduleGrid, Section, Slot, SlotPattern, SolveEnvelope, SolveParams,
    SolveResult, StudentRequests, Violation,
};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid input: {0}")]
    Msg(String),
}

/// Checks catalog and request shape. A subject with no qualified instructor
/// or usable room is deliberately NOT an error here: the solver treats it
/// as a per-subject scheduling gap, not malformed input.
pub fn validate(catalog: &Catalog, requests: &StudentRequests) -> Result<(), ValidationError> {
    let mut errors: Vec<String> = Vec::new();

    if catalog.rooms.is_empty() {
        errors.push("catalog has no rooms".into());
    }
    if catalog.instructors.is_empty() {
        errors.push("catalog has no instructors".into());
    }

    fn chk_unique<I: ToString>(name: &str, ids: impl Iterator<Item = I>, errors: &mut Vec<String>) {
        let mut seen = HashSet::new();
        for id in ids {
            let s = id.to_string();
            if !seen.insert(s.clone()) {
                errors.push(format!("duplicate {name}: {s}"));
            }
        }
    }
    chk_unique("room id", catalog.rooms.iter().map(|r| &r.id.0), &mut errors);
    chk_unique(
        "instructor name",
        catalog.instructors.iter().map(|t| &t.name.0),
        &mut errors,
    );

    for room in &catalog.rooms {
        if room.capacity == 0 {
            errors.push(format!("room {} has zero capacity", room.id));
        }
    }
    for instructor in &catalog.instructors {
        if instructor.subjects.is_empty() {
            errors.push(format!("instructor {} teaches no subjects", instructor.name));
        }
    }

    for (student, subjects) in requests {
        if subjects.is_empty() {
            errors.push(format!("student {student} requests no subjects"));
        }
        let unique: HashSet<_> = subjects.iter().collect();
        if unique.len() != subjects.len() {
            errors.push(format!("student {student} has duplicate subject requests"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Msg(errors.join("; ")))
    }
}

#[async_trait]
pub trait Solver: Send + Sync + 'static {
    async fn solve(&self, env: SolveEnvelope) -> anyhow::Result<SolveResult>;
}
