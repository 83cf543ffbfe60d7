pub mod split;
pub mod table;

pub use split::{render_toml, split_weighted, WorkerWeight};
pub use table::{Overlap, PartitionReport, PartitionTable, WorkerAssignment};

use crate::episode::EpisodeRange;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSelection {
    pub range: EpisodeRange,
    pub worker: Option<String>,
}

/// Picks the range for this machine: an explicit `--range` wins, otherwise the
/// named worker's assignment from a validated table.
pub fn select_range(
    table: &PartitionTable,
    worker: Option<&str>,
    explicit: Option<&[String]>,
) -> AppResult<RangeSelection> {
    if let Some(values) = explicit {
        let range = EpisodeRange::from_pair(values)?;
        for conflict in table.conflicts_with(&range, worker) {
            tracing::warn!(
                worker = %conflict.first,
                shared = %conflict.shared,
                "explicit range overlaps another worker's assignment"
            );
        }
        return Ok(RangeSelection {
            range,
            worker: worker.map(ToOwned::to_owned),
        });
    }

    let Some(name) = worker else {
        return Err(AppError::Config(
            "no range given: pass --range START END or select a worker from the partition table"
                .to_owned(),
        ));
    };

    table.ensure_valid()?;
    let assignment = table.find(name)?;
    Ok(RangeSelection {
        range: assignment.range()?,
        worker: Some(assignment.name.clone()),
    })
}
