use std::path::{Path, PathBuf};
use std::process::Command;

use crate::bootstrap::driver_env;
use crate::config::{LauncherConfig, RunConfig};
use crate::episode::EpisodeRange;

/// A fully resolved driver command line. Building it twice from the same
/// inputs yields the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: Vec<(&'static str, String)>,
}

pub fn build_invocation(
    launcher: &LauncherConfig,
    root_dir: &Path,
    range: &EpisodeRange,
    run: &RunConfig,
) -> DriverInvocation {
    let mut args = vec![
        launcher.driver_script.to_string_lossy().into_owned(),
        "--range".to_owned(),
        range.start().to_string(),
        range.end().to_string(),
        "--model".to_owned(),
        run.model.clone(),
        "--compute_type".to_owned(),
        run.compute_type.clone(),
    ];

    if let Some(language) = &run.language {
        args.push("--language".to_owned());
        args.push(language.clone());
    }
    if let Some(task) = run.task {
        args.push("--task".to_owned());
        args.push(task.as_arg().to_owned());
    }
    if let Some(index) = &run.index {
        args.push("--index".to_owned());
        args.push(index.to_string_lossy().into_owned());
    }
    if run.force {
        args.push("--force".to_owned());
    }

    DriverInvocation {
        program: launcher.python.clone(),
        args,
        working_dir: root_dir.to_path_buf(),
        env: driver_env(),
    }
}

impl DriverInvocation {
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(&self.working_dir);
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
    }

    /// Shell-like rendering for logs and `--dry-run`.
    pub fn render(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn has_force(&self) -> bool {
        self.args.iter().any(|arg| arg == "--force")
    }
}

fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:+@".contains(c));
    if plain {
        arg.to_owned()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
