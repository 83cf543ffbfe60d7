use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::config::{LauncherConfig, RunConfig};
use crate::episode::EpisodeRange;
use crate::error::{AppError, AppResult};
use crate::launcher::invocation::{build_invocation, DriverInvocation};
use crate::launcher::keep_awake::{KeepAwake, KeepAwakeStatus};

/// Runs one driver invocation to completion and reports its exit code.
pub trait DriverProcess {
    fn run(&self, invocation: &DriverInvocation) -> AppResult<i32>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDriver;

impl DriverProcess for SystemDriver {
    fn run(&self, invocation: &DriverInvocation) -> AppResult<i32> {
        let status = invocation.command().status().map_err(|error| match error.kind() {
            std::io::ErrorKind::NotFound => AppError::BinaryMissing {
                binary: invocation.program.clone(),
            },
            _ => AppError::Launch(format!("failed to start `{}`: {error}", invocation.program)),
        })?;
        Ok(exit_code_from_status(status))
    }
}

/// Maps a child exit status to the launcher's own exit code.
///
/// Signal termination becomes `128 + signal`, as shells report it.
pub fn exit_code_from_status(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub root_dir: PathBuf,
    pub range: EpisodeRange,
    pub run: RunConfig,
    pub worker: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaunchOutcome {
    pub run_id: String,
    pub worker: Option<String>,
    pub range: EpisodeRange,
    pub command_line: String,
    pub exit_code: i32,
    pub started_at_rfc3339: String,
    pub finished_at_rfc3339: String,
    pub elapsed_seconds: f64,
    pub keep_awake: Option<KeepAwakeStatus>,
}

impl LaunchOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Keeps the launcher alive on Ctrl-C so the driver's own exit code is what
/// gets reported. The terminal delivers SIGINT to the driver as well.
pub fn install_interrupt_passthrough() -> AppResult<()> {
    ctrlc::set_handler(|| {
        tracing::warn!("interrupt received; waiting for driver to exit");
    })
    .map_err(|error| AppError::Launch(format!("failed to register ctrl-c handler: {error}")))
}

/// Canonical root directory, or an error if it is missing or not a directory.
pub fn resolve_root(root_dir: &Path) -> AppResult<PathBuf> {
    let canonical = root_dir
        .canonicalize()
        .map_err(|error| AppError::RootDir(format!("{}: {error}", root_dir.display())))?;
    if !canonical.is_dir() {
        return Err(AppError::RootDir(format!(
            "{}: not a directory",
            canonical.display()
        )));
    }
    Ok(canonical)
}

pub fn launch<D, K>(
    request: &LaunchRequest,
    launcher: &LauncherConfig,
    driver: &D,
    keep_awake: &K,
) -> AppResult<LaunchOutcome>
where
    D: DriverProcess,
    K: KeepAwake,
{
    launch_with(request, launcher, driver, keep_awake, |root| {
        std::env::set_current_dir(root)
    })
}

pub(crate) fn launch_with<D, K, ChangeDirFn>(
    request: &LaunchRequest,
    launcher: &LauncherConfig,
    driver: &D,
    keep_awake: &K,
    change_dir: ChangeDirFn,
) -> AppResult<LaunchOutcome>
where
    D: DriverProcess,
    K: KeepAwake,
    ChangeDirFn: FnOnce(&Path) -> std::io::Result<()>,
{
    let root = resolve_root(&request.root_dir)?;
    change_dir(&root)
        .map_err(|error| AppError::RootDir(format!("{}: {error}", root.display())))?;

    let keep_awake_rx = keep_awake.engage(std::process::id());

    let invocation = build_invocation(launcher, &root, &request.range, &request.run);
    let run_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        run_id = %run_id,
        worker = request.worker.as_deref().unwrap_or("-"),
        range = %request.range,
        model = %request.run.model,
        compute_type = %request.run.compute_type,
        force = invocation.has_force(),
        root = %root.display(),
        "launching driver"
    );
    tracing::debug!(command = %invocation.render(), "driver command line");

    let started_at = Utc::now();
    let clock = Instant::now();
    let exit_code = driver.run(&invocation)?;
    let elapsed = clock.elapsed();
    let finished_at = Utc::now();

    let keep_awake_status = keep_awake_rx.try_recv().ok();
    if let Some(KeepAwakeStatus::Failed(reason)) = &keep_awake_status {
        tracing::warn!(reason = %reason, "host may have slept during the run");
    }

    if exit_code == 0 {
        tracing::info!(run_id = %run_id, elapsed_s = elapsed.as_secs_f64(), "driver finished");
    } else {
        tracing::error!(run_id = %run_id, exit_code, "driver exited with failure");
    }

    Ok(LaunchOutcome {
        run_id,
        worker: request.worker.clone(),
        range: request.range,
        command_line: invocation.render(),
        exit_code,
        started_at_rfc3339: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        finished_at_rfc3339: finished_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        elapsed_seconds: (elapsed.as_secs_f64() * 1_000.0).round() / 1_000.0,
        keep_awake: keep_awake_status,
    })
}

#[cfg(test)]
mod tests {
    use super::{exit_code_from_status, launch_with, resolve_root, DriverProcess, LaunchRequest};
    use crate::config::schema::{LauncherConfig, RunConfig};
    use crate::episode::EpisodeRange;
    use crate::error::{AppError, AppResult};
    use crate::launcher::invocation::DriverInvocation;
    use crate::launcher::keep_awake::{KeepAwake, KeepAwakeStatus, NoKeepAwake};
    use crossbeam_channel::Receiver;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    struct FakeDriver {
        exit_code: i32,
        calls: Mutex<Vec<DriverInvocation>>,
    }

    impl FakeDriver {
        fn exiting(exit_code: i32) -> Self {
            Self {
                exit_code,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl DriverProcess for FakeDriver {
        fn run(&self, invocation: &DriverInvocation) -> AppResult<i32> {
            self.calls.lock().expect("lock calls").push(invocation.clone());
            Ok(self.exit_code)
        }
    }

    struct FailingDriver;

    impl DriverProcess for FailingDriver {
        fn run(&self, _invocation: &DriverInvocation) -> AppResult<i32> {
            Err(AppError::Launch("python3 not found".to_owned()))
        }
    }

    struct BrokenKeepAwake;

    impl KeepAwake for BrokenKeepAwake {
        fn engage(&self, _pid: u32) -> Receiver<KeepAwakeStatus> {
            let (tx, rx) = crossbeam_channel::bounded(1);
            tx.send(KeepAwakeStatus::Failed("caffeinate missing".to_owned()))
                .expect("send");
            rx
        }
    }

    fn request(root: &Path, force: bool) -> LaunchRequest {
        LaunchRequest {
            root_dir: root.to_path_buf(),
            range: EpisodeRange::parse("E0501", "E1650").expect("range"),
            run: RunConfig {
                force,
                ..RunConfig::default()
            },
            worker: Some("studio".to_owned()),
        }
    }

    fn no_chdir(_: &Path) -> std::io::Result<()> {
        Ok(())
    }

    #[test]
    fn propagates_driver_exit_codes() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        for code in [0, 1, 2, 3, 137] {
            let driver = FakeDriver::exiting(code);
            let outcome = launch_with(
                &request(temp.path(), false),
                &LauncherConfig::default(),
                &driver,
                &NoKeepAwake,
                no_chdir,
            )
            .expect("launch");
            assert_eq!(outcome.exit_code, code);
            assert_eq!(outcome.succeeded(), code == 0);
            assert_eq!(driver.calls.lock().expect("lock").len(), 1);
        }
    }

    #[test]
    fn missing_root_fails_before_driver_runs() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let driver = FakeDriver::exiting(0);
        let mut changed = false;
        let error = launch_with(
            &request(&temp.path().join("absent"), false),
            &LauncherConfig::default(),
            &driver,
            &NoKeepAwake,
            |_| {
                changed = true;
                Ok(())
            },
        )
        .expect_err("missing root");
        assert!(matches!(error, AppError::RootDir(_)));
        assert!(!changed);
        assert!(driver.calls.lock().expect("lock").is_empty());
    }

    #[test]
    fn chdir_failure_aborts_launch() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let driver = FakeDriver::exiting(0);
        let error = launch_with(
            &request(temp.path(), false),
            &LauncherConfig::default(),
            &driver,
            &NoKeepAwake,
            |_| Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied)),
        )
        .expect_err("chdir fails");
        assert!(matches!(error, AppError::RootDir(_)));
        assert!(driver.calls.lock().expect("lock").is_empty());
    }

    #[test]
    fn driver_runs_in_canonical_root_with_request_options() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let driver = FakeDriver::exiting(0);
        let mut chdir_target = None;
        launch_with(
            &request(temp.path(), true),
            &LauncherConfig::default(),
            &driver,
            &NoKeepAwake,
            |root| {
                chdir_target = Some(root.to_path_buf());
                Ok(())
            },
        )
        .expect("launch");

        let canonical = temp.path().canonicalize().expect("canonical");
        assert_eq!(chdir_target, Some(canonical.clone()));
        let calls = driver.calls.lock().expect("lock");
        assert_eq!(calls[0].working_dir, canonical);
        assert!(calls[0].has_force());
        assert_eq!(&calls[0].args[1..4], ["--range", "E0501", "E1650"]);
    }

    #[test]
    fn keep_awake_failure_is_not_fatal() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let outcome = launch_with(
            &request(temp.path(), false),
            &LauncherConfig::default(),
            &FakeDriver::exiting(0),
            &BrokenKeepAwake,
            no_chdir,
        )
        .expect("launch");
        assert_eq!(outcome.exit_code, 0);
        assert!(matches!(outcome.keep_awake, Some(KeepAwakeStatus::Failed(_))));
    }

    #[test]
    fn spawn_failure_is_launch_error() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let error = launch_with(
            &request(temp.path(), false),
            &LauncherConfig::default(),
            &FailingDriver,
            &NoKeepAwake,
            no_chdir,
        )
        .expect_err("spawn fails");
        assert!(matches!(error, AppError::Launch(_)));
    }

    #[test]
    fn root_must_be_a_directory() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let file = temp.path().join("file.txt");
        std::fs::write(&file, "x").expect("write");
        assert!(matches!(
            resolve_root(&file),
            Err(AppError::RootDir(message)) if message.contains("not a directory")
        ));
        assert_eq!(
            resolve_root(temp.path()).expect("dir"),
            temp.path().canonicalize().expect("canonical")
        );
        assert!(resolve_root(&PathBuf::from("/definitely/not/here")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_mapping_covers_codes_and_signals() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(exit_code_from_status(std::process::ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code_from_status(std::process::ExitStatus::from_raw(3 << 8)), 3);
        // Raw wait status 9 is "killed by SIGKILL".
        assert_eq!(exit_code_from_status(std::process::ExitStatus::from_raw(9)), 137);
        assert_eq!(exit_code_from_status(std::process::ExitStatus::from_raw(15)), 143);
    }
}
