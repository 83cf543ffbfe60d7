use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Episode code such as `E0501`. Ordered by its numeric suffix.
///
/// Exactly four digits, the grammar the driver accepts, so the displayed form
/// always round-trips to the string that was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EpisodeCode(u32);

impl EpisodeCode {
    pub const MAX_NUMBER: u32 = 9999;

    /// `number` must not exceed [`Self::MAX_NUMBER`]; callers derive it from
    /// parsed codes.
    pub fn new(number: u32) -> Self {
        debug_assert!(number <= Self::MAX_NUMBER);
        Self(number)
    }

    pub fn number(self) -> u32 {
        self.0
    }

    pub fn next(self) -> Option<Self> {
        (self.0 < Self::MAX_NUMBER).then(|| Self(self.0 + 1))
    }

    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }
}

fn code_regex() -> &'static Regex {
    static CODE: OnceLock<Regex> = OnceLock::new();
    CODE.get_or_init(|| Regex::new(r"^E(\d{4})$").expect("episode code regex"))
}

fn dir_regex() -> &'static Regex {
    static DIR: OnceLock<Regex> = OnceLock::new();
    DIR.get_or_init(|| Regex::new(r"^E(\d{4})-(\d{8})$").expect("episode dir regex"))
}

fn parse_number(digits: &str, raw: &str) -> AppResult<u32> {
    digits
        .parse::<u32>()
        .map_err(|_| AppError::EpisodeId(format!("episode number out of range in {raw:?}")))
}

impl FromStr for EpisodeCode {
    type Err = AppError;

    fn from_str(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        let captures = code_regex().captures(trimmed).ok_or_else(|| {
            AppError::EpisodeId(format!("episode code must look like E0022 (got {raw:?})"))
        })?;
        parse_number(&captures[1], raw).map(Self)
    }
}

impl TryFrom<String> for EpisodeCode {
    type Error = AppError;

    fn try_from(value: String) -> AppResult<Self> {
        value.parse()
    }
}

impl From<EpisodeCode> for String {
    fn from(value: EpisodeCode) -> Self {
        value.to_string()
    }
}

impl fmt::Display for EpisodeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.0)
    }
}

/// An on-disk episode directory name, `E####-YYYYMMDD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeDir {
    code: EpisodeCode,
    date: String,
    name: String,
}

impl EpisodeDir {
    pub fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        let captures = dir_regex().captures(trimmed)?;
        let number = captures[1].parse::<u32>().ok()?;
        Some(Self {
            code: EpisodeCode(number),
            date: captures[2].to_owned(),
            name: trimmed.to_owned(),
        })
    }

    pub fn code(&self) -> EpisodeCode {
        self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_date(&self) -> &str {
        &self.date
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y%m%d").ok()
    }
}

impl fmt::Display for EpisodeDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
