use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::episode::{EpisodeCode, EpisodeRange};
use crate::error::{AppError, AppResult};

/// One `[[partition.workers]]` entry: a machine and its inclusive range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub name: String,
    pub start: EpisodeCode,
    pub end: EpisodeCode,
}

impl WorkerAssignment {
    pub fn range(&self) -> AppResult<EpisodeRange> {
        EpisodeRange::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Overlap {
    pub first: String,
    pub second: String,
    pub shared: EpisodeRange,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PartitionReport {
    pub workers: usize,
    pub invalid: Vec<String>,
    pub duplicate_names: Vec<String>,
    pub overlaps: Vec<Overlap>,
    pub gaps: Vec<EpisodeRange>,
    pub span: Option<EpisodeRange>,
}

impl PartitionReport {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty() && self.duplicate_names.is_empty() && self.overlaps.is_empty()
    }

    pub fn problems(&self) -> Vec<String> {
        let mut problems = self.invalid.clone();
        for name in &self.duplicate_names {
            problems.push(format!("worker `{name}` assigned more than once"));
        }
        for overlap in &self.overlaps {
            problems.push(format!(
                "`{}` and `{}` overlap on {}",
                overlap.first, overlap.second, overlap.shared
            ));
        }
        problems
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Partition: {} worker(s), {}\n",
            self.workers,
            if self.is_valid() { "valid" } else { "INVALID" }
        ));
        if let Some(span) = self.span {
            out.push_str(&format!("  span: {span} ({} ids)\n", span.item_count()));
        }
        for problem in self.problems() {
            out.push_str(&format!("  error: {problem}\n"));
        }
        for gap in &self.gaps {
            out.push_str(&format!(
                "  warning: gap {gap} ({} ids) assigned to no worker\n",
                gap.item_count()
            ));
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct PartitionTable {
    workers: Vec<WorkerAssignment>,
}

impl PartitionTable {
    pub fn new(workers: Vec<WorkerAssignment>) -> Self {
        Self { workers }
    }

    pub fn workers(&self) -> &[WorkerAssignment] {
        &self.workers
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn find(&self, name: &str) -> AppResult<&WorkerAssignment> {
        self.workers
            .iter()
            .find(|worker| worker.name == name)
            .ok_or_else(|| AppError::UnknownWorker(name.to_owned()))
    }

    /// Assignments belonging to other workers that intersect `range`.
    pub fn conflicts_with(&self, range: &EpisodeRange, except: Option<&str>) -> Vec<Overlap> {
        self.workers
            .iter()
            .filter(|worker| Some(worker.name.as_str()) != except)
            .filter_map(|worker| {
                let shared = worker.range().ok()?.intersection(range)?;
                Some(Overlap {
                    first: worker.name.clone(),
                    second: except.unwrap_or("--range").to_owned(),
                    shared,
                })
            })
            .collect()
    }

    pub fn validate(&self) -> PartitionReport {
        let mut report = PartitionReport {
            workers: self.workers.len(),
            ..PartitionReport::default()
        };

        let mut seen = BTreeSet::new();
        let mut ranged = Vec::new();
        for worker in &self.workers {
            if worker.name.trim().is_empty() {
                report
                    .invalid
                    .push(format!("worker with range {}-{} has no name", worker.start, worker.end));
            }
            let first_sighting = seen.insert(worker.name.as_str());
            if !first_sighting && !report.duplicate_names.contains(&worker.name) {
                report.duplicate_names.push(worker.name.clone());
            }
            match worker.range() {
                Ok(range) => ranged.push((worker.name.as_str(), range)),
                Err(error) => report
                    .invalid
                    .push(format!("worker `{}`: {error}", worker.name)),
            }
        }

        for (index, (first_name, first)) in ranged.iter().enumerate() {
            for (second_name, second) in &ranged[index + 1..] {
                if let Some(shared) = first.intersection(second) {
                    report.overlaps.push(Overlap {
                        first: (*first_name).to_owned(),
                        second: (*second_name).to_owned(),
                        shared,
                    });
                }
            }
        }

        ranged.sort_by_key(|(_, range)| (range.start(), range.end()));
        let mut covered_end: Option<EpisodeCode> = None;
        for (_, range) in &ranged {
            if let Some(end) = covered_end {
                if let (Some(gap_start), Some(gap_end)) = (end.next(), range.start().prev()) {
                    if gap_start <= gap_end {
                        if let Ok(gap) = EpisodeRange::new(gap_start, gap_end) {
                            report.gaps.push(gap);
                        }
                    }
                }
            }
            covered_end = Some(covered_end.map_or(range.end(), |end| end.max(range.end())));
        }

        if let (Some((_, first)), Some(end)) = (ranged.first(), covered_end) {
            report.span = EpisodeRange::new(first.start(), end).ok();
        }

        report
    }

    pub fn ensure_valid(&self) -> AppResult<PartitionReport> {
        let report = self.validate();
        if !report.is_valid() {
            return Err(AppError::Partition(report.problems().join("; ")));
        }
        for gap in &report.gaps {
            tracing::warn!(gap = %gap, "partition table leaves ids unassigned");
        }
        Ok(report)
    }
}
