use serde::Serialize;

use crate::episode::{EpisodeCatalog, EpisodeCode, EpisodeIndex, EpisodeRange};
use crate::ledger::manifest::{existing_outputs, output_dir, RunManifest, MANIFEST_FILE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EpisodeState {
    Done,
    Failed { exit_code: i32 },
    Partial { outputs: Vec<String> },
    Pending,
    Missing,
}

impl EpisodeState {
    fn label(&self) -> &'static str {
        match self {
            EpisodeState::Done => "done",
            EpisodeState::Failed { .. } => "failed",
            EpisodeState::Partial { .. } => "partial",
            EpisodeState::Pending => "pending",
            EpisodeState::Missing => "missing",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeProgress {
    pub code: EpisodeCode,
    pub dir: Option<String>,
    pub title: Option<String>,
    #[serde(flatten)]
    pub state: EpisodeState,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProgressCounts {
    pub done: usize,
    pub failed: usize,
    pub partial: usize,
    pub pending: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub range: EpisodeRange,
    pub model: String,
    pub counts: ProgressCounts,
    pub episodes: Vec<EpisodeProgress>,
}

/// Classifies every id in `range` by what the driver left on disk for `model`.
pub fn survey(
    catalog: &EpisodeCatalog,
    index: &EpisodeIndex,
    range: &EpisodeRange,
    model: &str,
) -> ProgressReport {
    let mut counts = ProgressCounts::default();
    let mut episodes = Vec::new();

    for code in range.codes() {
        let title = index
            .get(code)
            .map(|entry| entry.title.clone())
            .filter(|title| !title.is_empty());
        let Some(dir) = catalog.dir_for(code) else {
            counts.missing += 1;
            episodes.push(EpisodeProgress {
                code,
                dir: None,
                title,
                state: EpisodeState::Missing,
            });
            continue;
        };

        let out_dir = output_dir(&catalog.path_for(dir), model);
        let manifest_path = out_dir.join(MANIFEST_FILE);
        let state = match RunManifest::load(&manifest_path) {
            Ok(manifest) if manifest.run.exit_code == 0 => EpisodeState::Done,
            Ok(manifest) => EpisodeState::Failed {
                exit_code: manifest.run.exit_code,
            },
            Err(_) => {
                let outputs = existing_outputs(&out_dir);
                if outputs.is_empty() {
                    EpisodeState::Pending
                } else {
                    EpisodeState::Partial {
                        outputs: outputs.into_iter().map(ToOwned::to_owned).collect(),
                    }
                }
            }
        };

        match &state {
            EpisodeState::Done => counts.done += 1,
            EpisodeState::Failed { .. } => counts.failed += 1,
            EpisodeState::Partial { .. } => counts.partial += 1,
            EpisodeState::Pending => counts.pending += 1,
            EpisodeState::Missing => counts.missing += 1,
        }
        episodes.push(EpisodeProgress {
            code,
            dir: Some(dir.name().to_owned()),
            title,
            state,
        });
    }

    ProgressReport {
        range: *range,
        model: model.to_owned(),
        counts,
        episodes,
    }
}

impl ProgressReport {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Progress for {} (fw-{})\n", self.range, self.model));
        out.push_str(&format!(
            "  done={} failed={} partial={} pending={} missing={}\n\n",
            self.counts.done,
            self.counts.failed,
            self.counts.partial,
            self.counts.pending,
            self.counts.missing
        ));
        out.push_str(&format!("{:<8} {:<16} {:<8} {}\n", "EPISODE", "DIR", "STATE", "DETAIL"));

        for episode in &self.episodes {
            let detail = match &episode.state {
                EpisodeState::Failed { exit_code } => format!("exit_code={exit_code}"),
                EpisodeState::Partial { outputs } => {
                    format!("{} (driver needs --force)", outputs.join(","))
                }
                _ => episode.title.clone().unwrap_or_default(),
            };
            out.push_str(&format!(
                "{:<8} {:<16} {:<8} {}\n",
                episode.code,
                episode.dir.as_deref().unwrap_or("-"),
                episode.state.label(),
                detail
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::{survey, EpisodeState, ProgressCounts};
    use crate::episode::{EpisodeCatalog, EpisodeIndex, EpisodeRange};
    use crate::test_support::write_manifest;

    #[test]
    fn classifies_each_episode_state() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let root = temp.path();
        write_manifest(root, "E0001-20170101", "base", r#"{"run": {"exit_code": 0}}"#);
        write_manifest(root, "E0002-20170102", "base", r#"{"run": {"exit_code": 1}}"#);
        let partial = root.join("data/episodes/E0003-20170103/whisper/fw-base");
        std::fs::create_dir_all(&partial).expect("mkdir");
        std::fs::write(partial.join("run.log"), "boom").expect("write");
        std::fs::create_dir_all(root.join("data/episodes/E0004-20170104")).expect("mkdir");
        write_manifest(root, "E0004-20170104", "small", r#"{"run": {"exit_code": 0}}"#);

        let catalog =
            EpisodeCatalog::scan(&EpisodeCatalog::episodes_root_for(root)).expect("scan");
        let index = EpisodeIndex::parse("episode\tdate\ttitle\nE0004\t2017-01-04\tPending one\n");
        let range = EpisodeRange::parse("E0001", "E0005").expect("range");

        let report = survey(&catalog, &index, &range, "base");
        assert_eq!(
            report.counts,
            ProgressCounts {
                done: 1,
                failed: 1,
                partial: 1,
                pending: 1,
                missing: 1,
            }
        );
        assert_eq!(report.episodes[0].state, EpisodeState::Done);
        assert_eq!(report.episodes[1].state, EpisodeState::Failed { exit_code: 1 });
        assert_eq!(
            report.episodes[2].state,
            EpisodeState::Partial {
                outputs: vec!["run.log".to_owned()]
            }
        );
        assert_eq!(report.episodes[3].state, EpisodeState::Pending);
        assert_eq!(report.episodes[3].title.as_deref(), Some("Pending one"));
        assert_eq!(report.episodes[4].state, EpisodeState::Missing);

        let text = report.render_text();
        assert!(text.contains("done=1 failed=1 partial=1 pending=1 missing=1"));
        assert!(text.contains("driver needs --force"));
        assert!(text.contains("Pending one"));
    }

    #[test]
    fn json_rendering_flattens_state() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        write_manifest(temp.path(), "E0001-20170101", "base", r#"{"run": {"exit_code": 2}}"#);
        let catalog = EpisodeCatalog::scan(&EpisodeCatalog::episodes_root_for(temp.path()))
            .expect("scan");
        let range = EpisodeRange::parse("E0001", "E0001").expect("range");

        let report = survey(&catalog, &EpisodeIndex::default(), &range, "base");
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["episodes"][0]["code"], "E0001");
        assert_eq!(json["episodes"][0]["state"], "failed");
        assert_eq!(json["episodes"][0]["exit_code"], 2);
        assert_eq!(json["range"]["start"], "E0001");
    }
}
