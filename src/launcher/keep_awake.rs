use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use serde::Serialize;

const INHIBITOR_GRACE: Duration = Duration::from_millis(500);

/// Outcome of a keep-awake request, reported once by the background thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum KeepAwakeStatus {
    Engaged(String),
    Disabled,
    Unsupported(String),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InhibitorCommand {
    pub program: &'static str,
    pub args: Vec<String>,
}

/// The sleep inhibitor for `platform`, bound to the lifetime of process `pid`.
pub fn inhibitor_command(platform: Platform, pid: u32) -> Option<InhibitorCommand> {
    match platform {
        Platform::MacOs => Some(InhibitorCommand {
            program: "caffeinate",
            args: vec!["-dims".to_owned(), "-w".to_owned(), pid.to_string()],
        }),
        Platform::Linux => Some(InhibitorCommand {
            program: "systemd-inhibit",
            args: vec![
                "--what=idle:sleep".to_owned(),
                "--who=sawl-launcher".to_owned(),
                "--why=batch transcription in progress".to_owned(),
                "--mode=block".to_owned(),
                "sh".to_owned(),
                "-c".to_owned(),
                format!("while kill -0 {pid} 2>/dev/null; do sleep 5; done"),
            ],
        }),
        Platform::Other => None,
    }
}

pub trait KeepAwake {
    /// Starts the request without blocking; the receiver yields one status.
    fn engage(&self, pid: u32) -> Receiver<KeepAwakeStatus>;
}

#[derive(Debug, Clone)]
pub struct SystemKeepAwake {
    enabled: bool,
    platform: Platform,
}

impl SystemKeepAwake {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            platform: Platform::current(),
        }
    }
}

impl KeepAwake for SystemKeepAwake {
    fn engage(&self, pid: u32) -> Receiver<KeepAwakeStatus> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        if !self.enabled {
            let _ = tx.send(KeepAwakeStatus::Disabled);
            return rx;
        }
        let Some(inhibitor) = inhibitor_command(self.platform, pid) else {
            let _ = tx.send(KeepAwakeStatus::Unsupported(format!(
                "no sleep inhibitor for {:?}",
                self.platform
            )));
            return rx;
        };

        let spawned = thread::Builder::new()
            .name("sawl-keep-awake".to_owned())
            .spawn(move || {
                let status = hold_inhibitor(&inhibitor, INHIBITOR_GRACE);
                match &status {
                    KeepAwakeStatus::Engaged(tool) => {
                        tracing::debug!(tool = %tool, "keep-awake engaged")
                    }
                    KeepAwakeStatus::Failed(reason) => {
                        tracing::warn!(reason = %reason, "keep-awake request failed")
                    }
                    _ => {}
                }
                let _ = tx.send(status);
            });

        if let Err(error) = spawned {
            tracing::warn!(%error, "failed to spawn keep-awake thread");
        }
        rx
    }
}

fn hold_inhibitor(inhibitor: &InhibitorCommand, grace: Duration) -> KeepAwakeStatus {
    if which::which(inhibitor.program).is_err() {
        return KeepAwakeStatus::Failed(format!("`{}` not found in PATH", inhibitor.program));
    }

    let spawned = Command::new(inhibitor.program)
        .args(&inhibitor.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(error) => {
            return KeepAwakeStatus::Failed(format!(
                "failed to start `{}`: {error}",
                inhibitor.program
            ))
        }
    };

    // A refused inhibitor (polkit denial, no session bus) exits right away.
    thread::sleep(grace);
    match child.try_wait() {
        Ok(Some(status)) => {
            return KeepAwakeStatus::Failed(format!(
                "`{}` exited early ({status}): {}",
                inhibitor.program,
                drain_stderr(&mut child)
            ))
        }
        Ok(None) => {}
        Err(error) => {
            return KeepAwakeStatus::Failed(format!(
                "failed to poll `{}`: {error}",
                inhibitor.program
            ))
        }
    }

    let tool = inhibitor.program.to_owned();
    let reaper_tool = tool.clone();
    // The inhibitor exits on its own once the launcher process is gone.
    let reaper = thread::Builder::new()
        .name("sawl-keep-awake-reaper".to_owned())
        .spawn(move || match child.wait() {
            Ok(status) if !status.success() => tracing::warn!(
                tool = %reaper_tool,
                %status,
                stderr = %drain_stderr(&mut child),
                "keep-awake inhibitor exited; host may sleep"
            ),
            Ok(_) => {}
            Err(error) => tracing::warn!(tool = %reaper_tool, %error, "failed to reap inhibitor"),
        });
    if let Err(error) = reaper {
        tracing::warn!(%error, "failed to spawn keep-awake reaper thread");
    }

    KeepAwakeStatus::Engaged(tool)
}

fn drain_stderr(child: &mut Child) -> String {
    let mut text = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut text);
    }
    text.trim().to_owned()
}

/// A keep-awake that never touches the OS. Used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeepAwake;

impl KeepAwake for NoKeepAwake {
    fn engage(&self, _pid: u32) -> Receiver<KeepAwakeStatus> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let _ = tx.send(KeepAwakeStatus::Disabled);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::{
        hold_inhibitor, inhibitor_command, InhibitorCommand, KeepAwake, KeepAwakeStatus,
        NoKeepAwake, Platform, SystemKeepAwake,
    };
    use crate::test_support::{lock_env, EnvVarGuard};
    use std::path::Path;
    use std::time::Duration;

    #[cfg(unix)]
    fn fake_inhibitor(dir: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("systemd-inhibit");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write inhibitor");
        let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
    }

    fn linux_inhibitor() -> InhibitorCommand {
        inhibitor_command(Platform::Linux, std::process::id()).expect("linux")
    }

    #[test]
    fn macos_uses_caffeinate_bound_to_pid() {
        let command = inhibitor_command(Platform::MacOs, 4242).expect("macos");
        assert_eq!(command.program, "caffeinate");
        assert_eq!(command.args, ["-dims", "-w", "4242"]);
    }

    #[test]
    fn linux_uses_systemd_inhibit_polling_pid() {
        let command = inhibitor_command(Platform::Linux, 4242).expect("linux");
        assert_eq!(command.program, "systemd-inhibit");
        assert!(command.args.contains(&"--what=idle:sleep".to_owned()));
        assert!(command
            .args
            .last()
            .expect("script")
            .contains("kill -0 4242"));
    }

    #[test]
    fn other_platforms_have_no_inhibitor() {
        assert!(inhibitor_command(Platform::Other, 1).is_none());
    }

    #[test]
    fn disabled_request_reports_immediately() {
        let rx = SystemKeepAwake::new(false).engage(std::process::id());
        assert_eq!(rx.try_recv().expect("status"), KeepAwakeStatus::Disabled);
    }

    #[test]
    fn unsupported_platform_is_reported_not_raised() {
        let keep_awake = SystemKeepAwake {
            enabled: true,
            platform: Platform::Other,
        };
        let status = keep_awake.engage(1).recv().expect("status");
        assert!(matches!(status, KeepAwakeStatus::Unsupported(_)));
    }

    #[test]
    fn no_keep_awake_is_disabled() {
        let status = NoKeepAwake.engage(1).recv().expect("status");
        assert_eq!(status, KeepAwakeStatus::Disabled);
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_value(KeepAwakeStatus::Engaged("caffeinate".to_owned()))
            .expect("json");
        assert_eq!(json["state"], "engaged");
        assert_eq!(json["detail"], "caffeinate");
    }

    #[cfg(unix)]
    #[test]
    fn inhibitor_that_exits_early_is_reported_failed() {
        let _guard = lock_env();
        let temp = tempfile::TempDir::new().expect("tempdir");
        fake_inhibitor(temp.path(), "echo 'Access denied' >&2\nexit 1");
        let _path = EnvVarGuard::set("PATH", &temp.path().to_string_lossy());

        let status = hold_inhibitor(&linux_inhibitor(), Duration::from_millis(300));
        match status {
            KeepAwakeStatus::Failed(reason) => {
                assert!(reason.contains("systemd-inhibit"), "{reason}");
                assert!(reason.contains("Access denied"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn inhibitor_still_running_after_grace_is_engaged() {
        let _guard = lock_env();
        let temp = tempfile::TempDir::new().expect("tempdir");
        fake_inhibitor(temp.path(), "exec /bin/sleep 2");
        let _path = EnvVarGuard::set("PATH", &temp.path().to_string_lossy());

        let status = hold_inhibitor(&linux_inhibitor(), Duration::from_millis(100));
        assert_eq!(status, KeepAwakeStatus::Engaged("systemd-inhibit".to_owned()));
    }

    #[test]
    fn missing_inhibitor_binary_is_reported_failed() {
        let _guard = lock_env();
        let temp = tempfile::TempDir::new().expect("tempdir");
        let _path = EnvVarGuard::set("PATH", &temp.path().to_string_lossy());

        let status = hold_inhibitor(&linux_inhibitor(), Duration::from_millis(10));
        assert!(matches!(status, KeepAwakeStatus::Failed(reason) if reason.contains("not found")));
    }
}
