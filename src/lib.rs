pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod episode;
pub mod error;
pub mod history;
pub mod launcher;
pub mod ledger;
pub mod partition;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;

use clap::Parser;

use crate::bootstrap::AppPaths;
use crate::cli::{Cli, Command};
use crate::config::{load_config, AppConfig, ConfigSource};
use crate::doctor::{run_doctor, DoctorReport};
use crate::episode::{format_missing, EpisodeCatalog, EpisodeIndex, EpisodeRange};
use crate::error::AppResult;
use crate::history::{render_history, HistoryStore, LaunchRecord};
use crate::launcher::{
    build_invocation, install_interrupt_passthrough, launch, resolve_root, LaunchRequest,
    SystemDriver, SystemKeepAwake,
};
use crate::ledger::{speed_report, survey};
use crate::partition::{render_toml, select_range, split_weighted, RangeSelection, WorkerWeight};

const INDEX_FILE: &str = "data/episode_index.tsv";

trait CommandExecutor {
    fn run(
        &self,
        config: &AppConfig,
        paths: &AppPaths,
        range: Option<Vec<String>>,
        dry_run: bool,
    ) -> AppResult<i32>;
    fn plan(&self, config: &AppConfig, json: bool) -> AppResult<()>;
    fn split(&self, start: &str, end: &str, workers: &[String]) -> AppResult<()>;
    fn status(&self, config: &AppConfig, range: Option<Vec<String>>, json: bool) -> AppResult<()>;
    fn speed(&self, config: &AppConfig, range: Option<Vec<String>>) -> AppResult<()>;
    fn doctor(&self, config: &AppConfig, json: bool) -> AppResult<i32>;
    fn history(&self, config: &AppConfig, paths: &AppPaths, limit: usize) -> AppResult<()>;
}

struct DefaultCommandExecutor;

impl CommandExecutor for DefaultCommandExecutor {
    fn run(
        &self,
        config: &AppConfig,
        paths: &AppPaths,
        range: Option<Vec<String>>,
        dry_run: bool,
    ) -> AppResult<i32> {
        let selection = selection_for(config, range.as_deref())?;
        let root = root_dir(config)?;
        warn_missing_episodes(&root, &selection.range);

        if dry_run {
            let root = resolve_root(&root)?;
            let invocation =
                build_invocation(&config.launcher, &root, &selection.range, &config.run);
            println!("{}", invocation.render());
            return Ok(0);
        }

        install_interrupt_passthrough()?;
        let request = LaunchRequest {
            root_dir: root,
            range: selection.range,
            run: config.run.clone(),
            worker: selection.worker,
        };
        let outcome = launch(
            &request,
            &config.launcher,
            &SystemDriver,
            &SystemKeepAwake::new(config.keep_awake.enabled),
        )?;

        if config.history.enabled {
            let store = HistoryStore::new(history_db(config, paths));
            let record = LaunchRecord::from_outcome(
                &outcome,
                &config.run.model,
                &config.run.compute_type,
                config.run.force,
            );
            if let Err(error) = store.record(&record) {
                tracing::warn!(error = %error, "failed to record launch history");
            }
        }

        Ok(outcome.exit_code)
    }

    fn plan(&self, config: &AppConfig, json: bool) -> AppResult<()> {
        let report = config.partition.table().validate();
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", report.render_text());
        }
        Ok(())
    }

    fn split(&self, start: &str, end: &str, workers: &[String]) -> AppResult<()> {
        let range = EpisodeRange::parse(start, end)?;
        let weights = workers
            .iter()
            .map(|raw| WorkerWeight::parse(raw))
            .collect::<AppResult<Vec<_>>>()?;
        let assignments = split_weighted(&range, &weights)?;
        print!("{}", render_toml(&assignments)?);
        Ok(())
    }

    fn status(&self, config: &AppConfig, range: Option<Vec<String>>, json: bool) -> AppResult<()> {
        let selection = selection_for(config, range.as_deref())?;
        let root = root_dir(config)?;
        let catalog = EpisodeCatalog::scan(&EpisodeCatalog::episodes_root_for(&root))?;
        let index_file = index_path(config, &root);
        let index = EpisodeIndex::load(&index_file)?;
        tracing::debug!(
            path = %index_file.display(),
            entries = index.len(),
            episode_dirs = catalog.len(),
            "loaded episode catalog"
        );

        let report = survey(&catalog, &index, &selection.range, &config.run.model);
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", report.render_text());
        }
        Ok(())
    }

    fn speed(&self, config: &AppConfig, range: Option<Vec<String>>) -> AppResult<()> {
        let selection = selection_for(config, range.as_deref())?;
        let root = root_dir(config)?;
        let catalog = EpisodeCatalog::scan(&EpisodeCatalog::episodes_root_for(&root))?;

        match speed_report(&catalog, &selection.range, &config.run.model) {
            Some(report) => print!("{}", report.render_text()),
            None => println!("No completed episodes found in that range."),
        }
        Ok(())
    }

    fn doctor(&self, config: &AppConfig, json: bool) -> AppResult<i32> {
        let report = run_doctor(config);
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", report.render_text());
        }
        Ok(doctor_exit_code(&report))
    }

    fn history(&self, config: &AppConfig, paths: &AppPaths, limit: usize) -> AppResult<()> {
        let store = HistoryStore::new(history_db(config, paths));
        print!("{}", render_history(&store.list_recent(limit)?));
        Ok(())
    }
}

/// `doctor` exits 1 when a required check failed, so scripts can gate a
/// launch on it.
fn doctor_exit_code(report: &DoctorReport) -> i32 {
    if report.is_launchable() {
        0
    } else {
        1
    }
}

fn selection_for(config: &AppConfig, range: Option<&[String]>) -> AppResult<RangeSelection> {
    select_range(
        &config.partition.table(),
        config.launcher.worker.as_deref(),
        range,
    )
}

fn warn_missing_episodes(root: &std::path::Path, range: &EpisodeRange) {
    let episodes_root = EpisodeCatalog::episodes_root_for(root);
    if !episodes_root.is_dir() {
        return;
    }
    let catalog = match EpisodeCatalog::scan(&episodes_root) {
        Ok(catalog) => catalog,
        Err(error) => {
            tracing::warn!(
                path = %episodes_root.display(),
                %error,
                "could not scan episode directories before launch"
            );
            return;
        }
    };
    let resolution = catalog.resolve(range);
    if !resolution.missing.is_empty() {
        tracing::warn!(
            present = resolution.present.len(),
            missing = resolution.missing.len(),
            ids = %format_missing(&resolution.missing),
            "episode directories missing from range"
        );
    }
}

fn root_dir(config: &AppConfig) -> AppResult<PathBuf> {
    match &config.launcher.root_dir {
        Some(root) => Ok(root.clone()),
        None => Ok(std::env::current_dir()?),
    }
}

fn index_path(config: &AppConfig, root: &std::path::Path) -> PathBuf {
    match &config.run.index {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => root.join(path),
        None => root.join(INDEX_FILE),
    }
}

fn history_db(config: &AppConfig, paths: &AppPaths) -> PathBuf {
    config
        .history
        .db_path
        .clone()
        .unwrap_or_else(|| paths.history_db.clone())
}

fn execute_command<E: CommandExecutor>(
    command: Command,
    paths: &AppPaths,
    config: &AppConfig,
    executor: &E,
) -> AppResult<i32> {
    match command {
        Command::Run { range, dry_run, .. } => executor.run(config, paths, range, dry_run),
        Command::Plan { json } => executor.plan(config, json).map(|()| 0),
        Command::Split {
            start,
            end,
            workers,
        } => executor.split(&start, &end, &workers).map(|()| 0),
        Command::Status { range, json } => executor.status(config, range, json).map(|()| 0),
        Command::Speed { range } => executor.speed(config, range).map(|()| 0),
        Command::Doctor { json } => executor.doctor(config, json),
        Command::History { limit } => executor.history(config, paths, limit).map(|()| 0),
    }
}

/// Parses the command line, loads config and runs one command. The returned
/// code is the process exit code: the driver's for `run`, otherwise 0.
pub fn run() -> AppResult<i32> {
    let cli = Cli::parse();

    let paths = AppPaths::resolve()?;
    paths.ensure_dirs()?;

    let (config, source) = load_config(&paths, &cli.to_overrides())?;

    let fallback_level = config.diagnostics.log_level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact()
        .init();

    match &source {
        ConfigSource::WroteDefaults(path) => {
            tracing::info!(path = %path.display(), "wrote default config")
        }
        ConfigSource::File(path) => tracing::debug!(path = %path.display(), "loaded config"),
    }

    execute_command(cli.command, &paths, &config, &DefaultCommandExecutor)
}
