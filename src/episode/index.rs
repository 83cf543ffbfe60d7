use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::episode::id::EpisodeCode;
use crate::error::AppResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub date: String,
    pub title: String,
}

/// Episode metadata from `episode_index.tsv` (`episode`, `date`, `title` columns).
#[derive(Debug, Clone, Default)]
pub struct EpisodeIndex {
    entries: BTreeMap<EpisodeCode, IndexEntry>,
}

impl EpisodeIndex {
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read(path)?;
        Ok(Self::parse(&String::from_utf8_lossy(&raw)))
    }

    pub fn parse(text: &str) -> Self {
        let mut lines = text.lines();
        let Some(header) = lines.next() else {
            return Self::default();
        };

        let columns = header
            .split('\t')
            .map(|column| column.trim().to_ascii_lowercase())
            .collect::<Vec<_>>();
        let position = |name: &str| columns.iter().position(|column| column == name);
        let Some(episode_col) = position("episode") else {
            return Self::default();
        };
        let date_col = position("date");
        let title_col = position("title");

        let mut entries = BTreeMap::new();
        for line in lines {
            let fields = line.split('\t').collect::<Vec<_>>();
            let field = |index: Option<usize>| {
                index
                    .and_then(|index| fields.get(index))
                    .map(|value| value.trim().to_owned())
                    .unwrap_or_default()
            };

            let episode = field(Some(episode_col));
            if episode.is_empty() {
                continue;
            }
            let Ok(code) = episode.parse::<EpisodeCode>() else {
                tracing::debug!(episode = %episode, "skipping index row with unparseable episode");
                continue;
            };
            entries.insert(
                code,
                IndexEntry {
                    date: field(date_col),
                    title: field(title_col),
                },
            );
        }

        Self { entries }
    }

    pub fn get(&self, code: EpisodeCode) -> Option<&IndexEntry> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
