use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::partition::{PartitionTable, WorkerAssignment};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub launcher: LauncherConfig,
    pub run: RunConfig,
    pub keep_awake: KeepAwakeConfig,
    pub history: HistoryConfig,
    pub diagnostics: DiagnosticsConfig,
    pub partition: PartitionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// SAWL root; the driver runs here. Falls back to the current directory.
    pub root_dir: Option<PathBuf>,
    pub python: String,
    /// Relative paths resolve against `root_dir`.
    pub driver_script: PathBuf,
    pub worker: Option<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            python: "python3".to_owned(),
            driver_script: PathBuf::from("sawl_fw_run.py"),
            worker: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    pub model: String,
    pub compute_type: String,
    pub force: bool,
    pub language: Option<String>,
    pub task: Option<DriverTask>,
    pub index: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: "base".to_owned(),
            compute_type: "int8".to_owned(),
            force: false,
            language: None,
            task: None,
            index: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverTask {
    Transcribe,
    Translate,
}

impl DriverTask {
    pub fn as_arg(self) -> &'static str {
        match self {
            DriverTask::Transcribe => "transcribe",
            DriverTask::Translate => "translate",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepAwakeConfig {
    pub enabled: bool,
}

impl Default for KeepAwakeConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub db_path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub log_level: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PartitionConfig {
    pub workers: Vec<WorkerAssignment>,
}

impl PartitionConfig {
    pub fn table(&self) -> PartitionTable {
        PartitionTable::new(self.workers.clone())
    }
}
