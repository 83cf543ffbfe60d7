use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::bootstrap::AppPaths;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Serializes tests that touch process-wide state (env vars, cwd).
pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

/// Sets or clears an env var for the life of the guard. Hold `lock_env` too.
pub struct EnvVarGuard {
    key: &'static str,
    old: Option<String>,
}

impl EnvVarGuard {
    pub fn set(key: &'static str, value: &str) -> Self {
        let old = std::env::var(key).ok();
        std::env::set_var(key, value);
        Self { key, old }
    }

    pub fn clear(key: &'static str) -> Self {
        let old = std::env::var(key).ok();
        std::env::remove_var(key);
        Self { key, old }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(value) = self.old.as_ref() {
            std::env::set_var(self.key, value);
        } else {
            std::env::remove_var(self.key);
        }
    }
}

pub fn sample_paths(root: &Path) -> AppPaths {
    AppPaths {
        config_dir: root.join("config"),
        data_dir: root.join("data"),
        config_file: root.join("config/config.toml"),
        history_db: root.join("data/history.sqlite3"),
    }
}

/// Creates `data/episodes/<dir>/whisper/fw-<model>/manifest.json` under `root`.
pub fn write_manifest(root: &Path, dir: &str, model: &str, body: &str) {
    let out = root
        .join("data/episodes")
        .join(dir)
        .join("whisper")
        .join(format!("fw-{model}"));
    std::fs::create_dir_all(&out).expect("create output dir");
    std::fs::write(out.join("manifest.json"), body).expect("write manifest");
}
