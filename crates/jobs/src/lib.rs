//! In-process job board for timetable solves: enqueue an envelope, poll
//! the job id until the solver finishes. No queue persistence; everything
//! lives in one shared map.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use timetable_core::{SolveEnvelope, SolveResult, Solver};
use tracing::error;
use uuid::Uuid;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct JobId(pub String);

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status")]
pub enum JobStatus {
    Queued,
    Running,
    Done { result: SolveResult },
    Failed { message: String },
}

impl JobStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, JobStatus::Done { .. } | JobStatus::Failed { .. })
    }
}

#[derive(Clone)]
pub struct JobBoard<S: Solver> {
    statuses: Arc<RwLock<HashMap<String, JobStatus>>>,
    solver: Arc<S>,
}

impl<S: Solver> JobBoard<S> {
    pub fn new(solver: S) -> Self {
        Self {
            statuses: Default::default(),
            solver: Arc::new(solver),
        }
    }

    pub fn enqueue(&self, env: SolveEnvelope) -> JobId {
        let id = Uuid::new_v4().to_string();
        self.statuses.write().insert(id.clone(), JobStatus::Queued);

        let statuses = self.statuses.clone();
        let solver = self.solver.clone();
        let task_id = id.clone();

        tokio::spawn(async move {
            statuses
                .write()
                .insert(task_id.clone(), JobStatus::Running);
            match solver.solve(env).await {
                Ok(result) => {
                    statuses
                        .write()
                        .insert(task_id, JobStatus::Done { result });
                }
                Err(e) => {
                    error!(?e, "solve job failed");
                    statuses.write().insert(
                        task_id,
                        JobStatus::Failed {
                            message: e.to_string(),
                        },
                    );
                }
            }
        });

        JobId(id)
    }

    pub fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.statuses.read().get(&id.0).cloned()
    }

    pub fn result(&self, id: &JobId) -> Option<SolveResult> {
        match self.statuses.read().get(&id.0) {
            Some(JobStatus::Done { result }) => Some(result.clone()),
            _ => None,
        }
    }
}
