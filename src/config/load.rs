use std::path::{Path, PathBuf};

use crate::bootstrap::AppPaths;
use crate::config::schema::AppConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub root_dir: Option<PathBuf>,
    pub python: Option<String>,
    pub worker: Option<String>,
    pub model: Option<String>,
    pub compute_type: Option<String>,
    pub force: Option<bool>,
    pub keep_awake: Option<bool>,
}

/// Where the loaded config came from. Reported to the caller so it can be
/// logged once the subscriber exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    WroteDefaults(PathBuf),
}

pub fn load_config(
    paths: &AppPaths,
    overrides: &CliOverrides,
) -> AppResult<(AppConfig, ConfigSource)> {
    let config_path = overrides
        .config_path
        .clone()
        .unwrap_or_else(|| paths.config_file.clone());

    let (mut config, source) = if config_path.exists() {
        let raw = std::fs::read_to_string(&config_path)?;
        (
            toml::from_str::<AppConfig>(&raw)?,
            ConfigSource::File(config_path),
        )
    } else {
        let defaults = AppConfig::default();
        write_default_config(&config_path, &defaults)?;
        (defaults, ConfigSource::WroteDefaults(config_path))
    };

    if config.history.db_path.is_none() {
        config.history.db_path = Some(paths.history_db.clone());
    }

    apply_env_overrides(&mut config);
    apply_cli_overrides(&mut config, overrides);

    validate(&config)?;
    Ok((config, source))
}

fn write_default_config(path: &Path, defaults: &AppConfig) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(defaults)?;
    std::fs::write(path, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    Ok(())
}

fn validate(config: &AppConfig) -> AppResult<()> {
    if config.launcher.python.trim().is_empty() {
        return Err(AppError::Config("launcher.python must not be empty".to_owned()));
    }

    if config.launcher.driver_script.as_os_str().is_empty() {
        return Err(AppError::Config(
            "launcher.driver_script must not be empty".to_owned(),
        ));
    }

    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(value) = std::env::var("SAWL_ROOT") {
        if let Some(value) = non_empty(value) {
            config.launcher.root_dir = Some(PathBuf::from(value));
        }
    }
    if let Ok(value) = std::env::var("SAWL_PYTHON") {
        if let Some(value) = non_empty(value) {
            config.launcher.python = value;
        }
    }
    if let Ok(value) = std::env::var("SAWL_DRIVER") {
        if let Some(value) = non_empty(value) {
            config.launcher.driver_script = PathBuf::from(value);
        }
    }
    if let Ok(value) = std::env::var("SAWL_WORKER") {
        config.launcher.worker = non_empty(value);
    }
    if let Ok(value) = std::env::var("SAWL_MODEL") {
        if let Some(value) = non_empty(value) {
            config.run.model = value;
        }
    }
    if let Ok(value) = std::env::var("SAWL_COMPUTE_TYPE") {
        if let Some(value) = non_empty(value) {
            config.run.compute_type = value;
        }
    }
    if let Ok(value) = std::env::var("SAWL_FORCE") {
        if let Some(parsed) = parse_bool(&value) {
            config.run.force = parsed;
        }
    }
    if let Ok(value) = std::env::var("SAWL_KEEP_AWAKE") {
        if let Some(parsed) = parse_bool(&value) {
            config.keep_awake.enabled = parsed;
        }
    }
    if let Ok(value) = std::env::var("SAWL_HISTORY_DB_PATH") {
        if let Some(value) = non_empty(value) {
            config.history.db_path = Some(PathBuf::from(value));
        }
    }
    if let Ok(value) = std::env::var("SAWL_LOG_LEVEL") {
        config.diagnostics.log_level = value;
    }
}

fn apply_cli_overrides(config: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(value) = &overrides.root_dir {
        config.launcher.root_dir = Some(value.clone());
    }
    if let Some(value) = &overrides.python {
        config.launcher.python = value.clone();
    }
    if let Some(value) = &overrides.worker {
        config.launcher.worker = Some(value.clone());
    }
    if let Some(value) = &overrides.model {
        config.run.model = value.clone();
    }
    if let Some(value) = &overrides.compute_type {
        config.run.compute_type = value.clone();
    }
    if let Some(value) = overrides.force {
        config.run.force = value;
    }
    if let Some(value) = overrides.keep_awake {
        config.keep_awake.enabled = value;
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
