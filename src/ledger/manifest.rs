use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppResult;

/// Files the driver writes into each `fw-<model>` output directory.
pub const OUTPUT_FILES: [&str; 6] = [
    "transcript.txt",
    "segments.json",
    "timestamps.vtt",
    "timings.json",
    "run.log",
    "manifest.json",
];

pub const MANIFEST_FILE: &str = "manifest.json";

pub fn output_dir(episode_dir: &Path, model: &str) -> PathBuf {
    episode_dir.join("whisper").join(format!("fw-{model}"))
}

/// The subset of the driver's `manifest.json` the launcher reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunManifest {
    pub episode: String,
    pub audio: ManifestAudio,
    pub run: ManifestRun,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ManifestAudio {
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManifestRun {
    pub model: String,
    pub compute_type: String,
    pub elapsed_seconds: Option<f64>,
    pub finished_at: Option<String>,
    pub exit_code: i32,
}

impl Default for ManifestRun {
    fn default() -> Self {
        Self {
            model: String::new(),
            compute_type: String::new(),
            elapsed_seconds: None,
            finished_at: None,
            exit_code: 1,
        }
    }
}

impl RunManifest {
    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

pub fn existing_outputs(out_dir: &Path) -> Vec<&'static str> {
    OUTPUT_FILES
        .iter()
        .copied()
        .filter(|name| out_dir.join(name).exists())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{existing_outputs, output_dir, RunManifest};
    use std::path::Path;

    #[test]
    fn output_dir_follows_model_name() {
        assert_eq!(
            output_dir(Path::new("data/episodes/E0022-20180112"), "large-v3-turbo"),
            Path::new("data/episodes/E0022-20180112/whisper/fw-large-v3-turbo")
        );
    }

    #[test]
    fn loads_driver_manifest_and_ignores_extra_fields() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let path = temp.path().join("manifest.json");
        std::fs::write(
            &path,
            r#"{
  "episode": "E0022-20180112",
  "audio": {"path": "data/episodes/E0022-20180112/audio/E0022-20180112.mp3", "duration_seconds": 1834.5},
  "run": {"tool": "faster-whisper", "model": "base", "compute_type": "int8", "device": "cpu",
          "elapsed_seconds": 301.25, "started_at": "2026-01-01T00:00:00+00:00",
          "finished_at": "2026-01-01T00:05:01+00:00", "exit_code": 0},
  "outputs": {"dir": "x"},
  "platform": {"system": "Darwin"}
}"#,
        )
        .expect("write");

        let manifest = RunManifest::load(&path).expect("load");
        assert_eq!(manifest.episode, "E0022-20180112");
        assert_eq!(manifest.audio.duration_seconds, Some(1834.5));
        assert_eq!(manifest.run.model, "base");
        assert_eq!(manifest.run.elapsed_seconds, Some(301.25));
        assert_eq!(manifest.run.exit_code, 0);
    }

    #[test]
    fn missing_exit_code_counts_as_failure() {
        let raw = r#"{"episode": "E0001-20170101", "audio": {"duration_seconds": null}}"#;
        let manifest: RunManifest = serde_json::from_str(raw).expect("parse");
        assert_eq!(manifest.run.exit_code, 1);
        assert_eq!(manifest.audio.duration_seconds, None);
    }

    #[test]
    fn existing_outputs_lists_present_files() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        std::fs::write(temp.path().join("run.log"), "").expect("write");
        std::fs::write(temp.path().join("transcript.txt"), "").expect("write");
        assert_eq!(existing_outputs(temp.path()), ["transcript.txt", "run.log"]);
    }
}
