use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::episode::id::{EpisodeCode, EpisodeDir};
use crate::episode::range::EpisodeRange;
use crate::error::AppResult;

const MISSING_PREVIEW_LIMIT: usize = 30;

/// Episode directories found under `data/episodes`, keyed by code.
#[derive(Debug, Clone)]
pub struct EpisodeCatalog {
    episodes_root: PathBuf,
    dirs: BTreeMap<EpisodeCode, EpisodeDir>,
}

#[derive(Debug, Clone, Default)]
pub struct RangeResolution {
    pub present: Vec<EpisodeDir>,
    pub missing: Vec<EpisodeCode>,
}

impl EpisodeCatalog {
    pub fn episodes_root_for(root_dir: &Path) -> PathBuf {
        root_dir.join("data").join("episodes")
    }

    pub fn scan(episodes_root: &Path) -> AppResult<Self> {
        let mut dirs = BTreeMap::new();
        if !episodes_root.exists() {
            return Ok(Self {
                episodes_root: episodes_root.to_path_buf(),
                dirs,
            });
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(episodes_root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_owned());
            }
        }
        names.sort();

        for name in names {
            let Some(dir) = EpisodeDir::parse(&name) else {
                continue;
            };
            if let Some(existing) = dirs.get(&dir.code()) {
                tracing::warn!(
                    code = %dir.code(),
                    kept = %existing,
                    ignored = %dir,
                    "duplicate episode directories for one code"
                );
                continue;
            }
            dirs.insert(dir.code(), dir);
        }

        Ok(Self {
            episodes_root: episodes_root.to_path_buf(),
            dirs,
        })
    }

    pub fn episodes_root(&self) -> &Path {
        &self.episodes_root
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn dir_for(&self, code: EpisodeCode) -> Option<&EpisodeDir> {
        self.dirs.get(&code)
    }

    pub fn path_for(&self, dir: &EpisodeDir) -> PathBuf {
        self.episodes_root.join(dir.name())
    }

    pub fn resolve(&self, range: &EpisodeRange) -> RangeResolution {
        let mut resolution = RangeResolution::default();
        for code in range.codes() {
            match self.dirs.get(&code) {
                Some(dir) => resolution.present.push(dir.clone()),
                None => resolution.missing.push(code),
            }
        }
        resolution
    }
}

/// Renders missing codes as `E0001, E0002 ... (+N more)`.
pub fn format_missing(missing: &[EpisodeCode]) -> String {
    let shown = missing
        .iter()
        .take(MISSING_PREVIEW_LIMIT)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if missing.len() <= MISSING_PREVIEW_LIMIT {
        shown
    } else {
        format!(
            "{shown} ... (+{} more)",
            missing.len() - MISSING_PREVIEW_LIMIT
        )
    }
}
