//! Adaptive multi-attempt timetable solver. Each attempt rebuilds the
//! pattern pool and the sections, assigns meeting patterns, then enrolls
//! every student; failed attempts feed their bottleneck subjects back into
//! the section plan before the next try.

pub mod assign;
pub mod enroll;
pub mod pattern;
pub mod plan;

use async_trait::async_trait;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use timetable_core::Solver;
use tracing::{debug, info, warn};
use types::{
    FailedRequest, ScheduleGrid, Section, SolveEnvelope, SolveResult, StudentId, Subject,
};

/// How many of the worst-failing subjects get an extra section per retry.
const BOTTLENECK_SUBJECTS: usize = 3;

pub struct BacktrackSolver;

impl BacktrackSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BacktrackSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Solver for BacktrackSolver {
    async fn solve(&self, env: SolveEnvelope) -> anyhow::Result<SolveResult> {
        Ok(run(env))
    }
}

struct BestAttempt {
    sections: Vec<Section>,
    schedules: BTreeMap<StudentId, Option<ScheduleGrid>>,
    failed: Vec<FailedRequest>,
}

/// Runs the whole solve synchronously. Single-threaded by design: every
/// attempt owns its sections and grids, and the best attempt is kept as a
/// deep copy so later attempts cannot touch it.
pub fn run(env: SolveEnvelope) -> SolveResult {
    let mut rng = ChaCha8Rng::seed_from_u64(env.params.seed);
    let catalog = env.catalog;
    let requests = env.requests;

    let demand = plan::demand(&requests);
    let mut section_plan = plan::initial_plan(&demand, requests.len());
    let max_attempts = env.params.max_attempts.max(1);

    let mut best: Option<BestAttempt> = None;

    for attempt in 1..=max_attempts {
        let mut pool = pattern::generate_pool(&mut rng);
        let mut sections = plan::build_sections(&catalog, &demand, &section_plan, &mut rng);

        if sections.is_empty() {
            warn!("no sections could be created for any subject");
            return SolveResult {
                status: "infeasible".into(),
                sections: vec![],
                schedules: BTreeMap::new(),
                failed: vec![],
                attempts: attempt,
                stats: serde_json::json!({"note": "no sections created"}),
            };
        }

        assign::assign_patterns(&mut sections, &mut pool, &mut rng);
        let outcome = enroll::enroll_students(&mut sections, &requests, &mut rng);

        if outcome.failed.is_empty() {
            info!(attempt, "all student requests satisfied");
            return SolveResult {
                status: "solved".into(),
                sections,
                schedules: outcome.schedules,
                failed: vec![],
                attempts: attempt,
                stats: serde_json::json!({"attempts": attempt}),
            };
        }
        debug!(
            attempt,
            failed = outcome.failed.len(),
            "attempt finished with failed requests"
        );

        if best
            .as_ref()
            .map_or(true, |b| outcome.failed.len() < b.failed.len())
        {
            best = Some(BestAttempt {
                sections: sections.clone(),
                schedules: outcome.schedules.clone(),
                failed: outcome.failed.clone(),
            });
        }

        grow_bottlenecks(&outcome.failed, &demand, &mut section_plan);
    }

    match best {
        Some(b) => {
            warn!(
                attempts = max_attempts,
                failed = b.failed.len(),
                "attempt budget exhausted; committing best attempt"
            );
            let failed_count = b.failed.len();
            SolveResult {
                status: "partial".into(),
                sections: b.sections,
                schedules: b.schedules,
                failed: b.failed,
                attempts: max_attempts,
                stats: serde_json::json!({
                    "attempts": max_attempts,
                    "residual_failures": failed_count,
                }),
            }
        }
        // Unreachable when max_attempts >= 1: every looped attempt either
        // returned or recorded a best.
        None => SolveResult {
            status: "infeasible".into(),
            sections: vec![],
            schedules: BTreeMap::new(),
            failed: vec![],
            attempts: 0,
            stats: serde_json::json!({}),
        },
    }
}

/// Gives the worst few subjects of this attempt one more planned section,
/// capped so a stubborn subject cannot grow without bound.
fn grow_bottlenecks(
    failed: &[FailedRequest],
    demand: &BTreeMap<Subject, u32>,
    section_plan: &mut BTreeMap<Subject, u32>,
) {
    let mut by_subject: BTreeMap<&Subject, u32> = BTreeMap::new();
    for fr in failed {
        *by_subject.entry(&fr.failed_at).or_insert(0) += 1;
    }

    let mut worst: Vec<(&Subject, u32)> = by_subject.into_iter().collect();
    worst.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    for (subject, _) in worst.into_iter().take(BOTTLENECK_SUBJECTS) {
        let Some(&d) = demand.get(subject) else {
            continue;
        };
        let cap = plan::plan_cap(d);
        let planned = section_plan.entry(subject.clone()).or_insert(2);
        if *planned < cap {
            *planned += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{FailedRequest, StudentId};

    fn fail(student: &str, subject: &str) -> FailedRequest {
        FailedRequest {
            student: StudentId::from(student),
            failed_at: Subject::from(subject),
            requested: vec![Subject::from(subject)],
        }
    }

    #[test]
    fn top_three_bottlenecks_each_gain_a_section() {
        let mut demand = BTreeMap::new();
        let mut plan = BTreeMap::new();
        for s in ["Maths", "Physics", "History", "Drama"] {
            demand.insert(Subject::from(s), 30);
            plan.insert(Subject::from(s), 4);
        }

        let failed = vec![
            fail("a", "Maths"),
            fail("b", "Maths"),
            fail("c", "Maths"),
            fail("d", "Physics"),
            fail("e", "Physics"),
            fail("f", "History"),
            fail("g", "Drama"),
        ];
        grow_bottlenecks(&failed, &demand, &mut plan);

        assert_eq!(plan[&Subject::from("Maths")], 5);
        assert_eq!(plan[&Subject::from("Physics")], 5);
        // History and Drama tie at one failure; the subject name breaks it.
        assert_eq!(plan[&Subject::from("Drama")], 5);
        assert_eq!(plan[&Subject::from("History")], 4);
    }

    #[test]
    fn growth_respects_the_cap() {
        let mut demand = BTreeMap::new();
        demand.insert(Subject::from("Maths"), 3);
        let mut plan = BTreeMap::new();
        plan.insert(Subject::from("Maths"), 7); // cap for demand 3 is 7

        let failed = vec![fail("a", "Maths")];
        grow_bottlenecks(&failed, &demand, &mut plan);
        assert_eq!(plan[&Subject::from("Maths")], 7);
    }

    #[test]
    fn unknown_subjects_never_enter_the_plan() {
        let demand = BTreeMap::new();
        let mut plan = BTreeMap::new();
        let failed = vec![fail("a", "Alchemy")];
        grow_bottlenecks(&failed, &demand, &mut plan);
        assert!(plan.is_empty());
    }
}
