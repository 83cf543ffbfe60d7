use serde::Serialize;

use crate::launcher::LaunchOutcome;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchRecord {
    pub run_id: String,
    pub worker: Option<String>,
    pub range_start: String,
    pub range_end: String,
    pub model: String,
    pub compute_type: String,
    pub force: bool,
    pub exit_code: i32,
    pub started_at_rfc3339: String,
    pub finished_at_rfc3339: String,
    pub elapsed_seconds: f64,
}

impl LaunchRecord {
    pub fn from_outcome(
        outcome: &LaunchOutcome,
        model: &str,
        compute_type: &str,
        force: bool,
    ) -> Self {
        Self {
            run_id: outcome.run_id.clone(),
            worker: outcome.worker.clone(),
            range_start: outcome.range.start().to_string(),
            range_end: outcome.range.end().to_string(),
            model: model.to_owned(),
            compute_type: compute_type.to_owned(),
            force,
            exit_code: outcome.exit_code,
            started_at_rfc3339: outcome.started_at_rfc3339.clone(),
            finished_at_rfc3339: outcome.finished_at_rfc3339.clone(),
            elapsed_seconds: outcome.elapsed_seconds,
        }
    }
}
