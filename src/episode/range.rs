use std::fmt;

use serde::Serialize;

use crate::episode::id::EpisodeCode;
use crate::error::{AppError, AppResult};

/// Inclusive range of episode codes. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EpisodeRange {
    start: EpisodeCode,
    end: EpisodeCode,
}

impl EpisodeRange {
    pub fn new(start: EpisodeCode, end: EpisodeCode) -> AppResult<Self> {
        if end < start {
            return Err(AppError::Range(format!(
                "range END must be >= START (got {start} {end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> AppResult<Self> {
        Self::new(start.parse()?, end.parse()?)
    }

    /// Parses the two values of a `--range START END` argument.
    pub fn from_pair(values: &[String]) -> AppResult<Self> {
        match values {
            [start, end] => Self::parse(start, end),
            _ => Err(AppError::Range(format!(
                "expected exactly two values (START END), got {}",
                values.len()
            ))),
        }
    }

    pub fn start(&self) -> EpisodeCode {
        self.start
    }

    pub fn end(&self) -> EpisodeCode {
        self.end
    }

    pub fn item_count(&self) -> u64 {
        u64::from(self.end.number()) - u64::from(self.start.number()) + 1
    }

    pub fn contains(&self, code: EpisodeCode) -> bool {
        self.start <= code && code <= self.end
    }

    pub fn overlaps(&self, other: &EpisodeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn intersection(&self, other: &EpisodeRange) -> Option<EpisodeRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(EpisodeRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    pub fn codes(&self) -> impl Iterator<Item = EpisodeCode> {
        (self.start.number()..=self.end.number()).map(EpisodeCode::new)
    }
}

impl fmt::Display for EpisodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
