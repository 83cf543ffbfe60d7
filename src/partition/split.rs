use serde::Serialize;

use crate::episode::{EpisodeCode, EpisodeRange};
use crate::error::{AppError, AppResult};
use crate::partition::table::WorkerAssignment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerWeight {
    pub name: String,
    pub weight: u32,
}

impl WorkerWeight {
    /// Parses `name` or `name:weight`; weight defaults to 1.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let (name, weight) = match raw.rsplit_once(':') {
            Some((name, weight)) => {
                let weight = weight.trim().parse::<u32>().map_err(|_| {
                    AppError::Partition(format!("invalid weight in `{raw}` (expected NAME:WEIGHT)"))
                })?;
                (name, weight)
            }
            None => (raw, 1),
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Partition(format!("worker name missing in `{raw}`")));
        }
        Ok(Self {
            name: name.to_owned(),
            weight,
        })
    }
}

/// Splits `range` into contiguous shares proportional to each worker's weight.
///
/// Shares follow the given worker order. Floor division leaves a remainder,
/// handed out one id at a time to the earliest workers.
pub fn split_weighted(
    range: &EpisodeRange,
    workers: &[WorkerWeight],
) -> AppResult<Vec<WorkerAssignment>> {
    if workers.is_empty() {
        return Err(AppError::Partition("at least one worker is required".to_owned()));
    }
    if let Some(worker) = workers.iter().find(|worker| worker.weight == 0) {
        return Err(AppError::Partition(format!(
            "worker `{}` has weight 0",
            worker.name
        )));
    }

    let total = range.item_count();
    let weight_sum: u64 = workers.iter().map(|worker| u64::from(worker.weight)).sum();
    let mut shares = workers
        .iter()
        .map(|worker| total * u64::from(worker.weight) / weight_sum)
        .collect::<Vec<_>>();
    let assigned: u64 = shares.iter().sum();
    let remainder = total - assigned;
    for share in shares.iter_mut().take(remainder as usize) {
        *share += 1;
    }

    let mut assignments = Vec::with_capacity(workers.len());
    let mut next_start = u64::from(range.start().number());
    for (worker, share) in workers.iter().zip(shares) {
        if share == 0 {
            return Err(AppError::Partition(format!(
                "range {range} is too small to give worker `{}` any ids",
                worker.name
            )));
        }
        let end = next_start + share - 1;
        assignments.push(WorkerAssignment {
            name: worker.name.clone(),
            start: EpisodeCode::new(next_start as u32),
            end: EpisodeCode::new(end as u32),
        });
        next_start = end + 1;
    }

    Ok(assignments)
}

#[derive(Serialize)]
struct PartitionSnippet<'a> {
    partition: WorkersSnippet<'a>,
}

#[derive(Serialize)]
struct WorkersSnippet<'a> {
    workers: &'a [WorkerAssignment],
}

/// Renders assignments as a `[[partition.workers]]` config fragment.
pub fn render_toml(assignments: &[WorkerAssignment]) -> AppResult<String> {
    Ok(toml::to_string_pretty(&PartitionSnippet {
        partition: WorkersSnippet {
            workers: assignments,
        },
    })?)
}
