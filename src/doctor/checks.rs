use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;
use regex::Regex;

use crate::config::AppConfig;
use crate::doctor::report::{CheckResult, CheckStatus, DoctorReport, DoctorState};
use crate::episode::EpisodeCatalog;
use crate::launcher::keep_awake::{inhibitor_command, Platform};

pub fn run_doctor(config: &AppConfig) -> DoctorReport {
    let root = config
        .launcher
        .root_dir
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut checks = vec![
        check_binary_version(
            &config.launcher.python,
            "3.8",
            true,
            Some("Install python3 >= 3.8 or point launcher.python / SAWL_PYTHON at it."),
        ),
        check_root_dir(&root),
        check_driver_script(&root, &config.launcher.driver_script),
        check_episodes_dir(&root),
        check_binary_version(
            "ffprobe",
            "4.0",
            false,
            Some("Install ffmpeg (includes ffprobe); the driver records audio durations with it."),
        ),
        check_keep_awake(config.keep_awake.enabled, Platform::current()),
    ];
    checks.push(check_partition(config));

    summarize(checks)
}

fn summarize(checks: Vec<CheckResult>) -> DoctorReport {
    let required_failed = checks
        .iter()
        .any(|check| check.required && check.status == CheckStatus::Fail);
    let any_degraded = checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Warn | CheckStatus::Fail));

    let state = if required_failed {
        DoctorState::Unavailable
    } else if any_degraded {
        DoctorState::Degraded
    } else {
        DoctorState::Ready
    };

    DoctorReport {
        generated_at_rfc3339: Utc::now().to_rfc3339(),
        state,
        checks,
    }
}

fn check_root_dir(root: &Path) -> CheckResult {
    let (status, detail, remediation) = if root.is_dir() {
        (CheckStatus::Pass, format!("{}", root.display()), None)
    } else {
        (
            CheckStatus::Fail,
            format!("{} is not a directory", root.display()),
            Some("Set launcher.root_dir, SAWL_ROOT or --root to the SAWL checkout.".to_owned()),
        )
    };
    CheckResult {
        name: "root_dir".to_owned(),
        status,
        detail,
        required: true,
        remediation,
    }
}

fn check_driver_script(root: &Path, script: &Path) -> CheckResult {
    let resolved = root.join(script);
    if resolved.is_file() {
        CheckResult {
            name: "driver_script".to_owned(),
            status: CheckStatus::Pass,
            detail: format!("{}", resolved.display()),
            required: true,
            remediation: None,
        }
    } else {
        CheckResult {
            name: "driver_script".to_owned(),
            status: CheckStatus::Fail,
            detail: format!("{} not found", resolved.display()),
            required: true,
            remediation: Some(
                "Set launcher.driver_script (relative to the root) or SAWL_DRIVER.".to_owned(),
            ),
        }
    }
}

fn check_episodes_dir(root: &Path) -> CheckResult {
    let episodes_root = EpisodeCatalog::episodes_root_for(root);
    match EpisodeCatalog::scan(&episodes_root) {
        Ok(catalog) if !catalog.is_empty() => CheckResult {
            name: "episodes_dir".to_owned(),
            status: CheckStatus::Pass,
            detail: format!(
                "{} episode dirs in {}",
                catalog.len(),
                catalog.episodes_root().display()
            ),
            required: false,
            remediation: None,
        },
        Ok(_) => CheckResult {
            name: "episodes_dir".to_owned(),
            status: CheckStatus::Warn,
            detail: format!("no E####-YYYYMMDD dirs in {}", episodes_root.display()),
            required: false,
            remediation: Some("Sync data/episodes onto this machine before launching.".to_owned()),
        },
        Err(error) => CheckResult {
            name: "episodes_dir".to_owned(),
            status: CheckStatus::Warn,
            detail: format!("failed to scan {}: {error}", episodes_root.display()),
            required: false,
            remediation: Some("Check permissions on data/episodes.".to_owned()),
        },
    }
}

fn check_keep_awake(enabled: bool, platform: Platform) -> CheckResult {
    let name = "keep_awake".to_owned();
    if !enabled {
        return CheckResult {
            name,
            status: CheckStatus::Skip,
            detail: "disabled in config".to_owned(),
            required: false,
            remediation: None,
        };
    }
    let Some(inhibitor) = inhibitor_command(platform, std::process::id()) else {
        return CheckResult {
            name,
            status: CheckStatus::Skip,
            detail: format!("no sleep inhibitor for {platform:?}"),
            required: false,
            remediation: None,
        };
    };

    match which::which(inhibitor.program) {
        Ok(path) => CheckResult {
            name,
            status: CheckStatus::Pass,
            detail: format!("{}", path.display()),
            required: false,
            remediation: None,
        },
        Err(_) => CheckResult {
            name,
            status: CheckStatus::Warn,
            detail: format!("`{}` not found in PATH", inhibitor.program),
            required: false,
            remediation: Some(
                "Long runs may be interrupted by sleep; disable power saving manually.".to_owned(),
            ),
        },
    }
}

fn check_partition(config: &AppConfig) -> CheckResult {
    let table = config.partition.table();
    if table.is_empty() {
        return CheckResult {
            name: "partition_table".to_owned(),
            status: CheckStatus::Skip,
            detail: "no [[partition.workers]] configured".to_owned(),
            required: false,
            remediation: None,
        };
    }

    let report = table.validate();
    let worker_note = match &config.launcher.worker {
        Some(worker) if table.find(worker).is_err() => {
            Some(format!("current worker `{worker}` is not in the table"))
        }
        _ => None,
    };

    if !report.is_valid() {
        return CheckResult {
            name: "partition_table".to_owned(),
            status: CheckStatus::Fail,
            detail: report.problems().join("; "),
            required: true,
            remediation: Some("Make worker ranges disjoint (see `sawl-launcher plan`).".to_owned()),
        };
    }

    let mut notes = Vec::new();
    if !report.gaps.is_empty() {
        notes.push(format!("{} gap(s)", report.gaps.len()));
    }
    notes.extend(worker_note);

    if notes.is_empty() {
        CheckResult {
            name: "partition_table".to_owned(),
            status: CheckStatus::Pass,
            detail: format!("{} worker(s), disjoint", report.workers),
            required: true,
            remediation: None,
        }
    } else {
        CheckResult {
            name: "partition_table".to_owned(),
            status: CheckStatus::Warn,
            detail: notes.join("; "),
            required: true,
            remediation: Some("Run `sawl-launcher plan` for details.".to_owned()),
        }
    }
}

fn check_binary_version(
    binary: &str,
    min_version: &str,
    required: bool,
    remediation: Option<&str>,
) -> CheckResult {
    let missing = || CheckResult {
        name: binary.to_owned(),
        status: CheckStatus::Fail,
        detail: "binary not found in PATH".to_owned(),
        required,
        remediation: remediation.map(ToOwned::to_owned),
    };

    let path = match which::which(binary) {
        Ok(path) => path,
        Err(_) => return missing(),
    };

    let parsed = version_output(&path)
        .as_deref()
        .and_then(parse_version_triplet);

    match parsed {
        Some(found) if found >= parse_target_version(min_version) => CheckResult {
            name: binary.to_owned(),
            status: CheckStatus::Pass,
            detail: format!(
                "{} (>= {}) at {}",
                version_triplet_string(&found),
                min_version,
                path.display()
            ),
            required,
            remediation: None,
        },
        Some(found) => CheckResult {
            name: binary.to_owned(),
            status: CheckStatus::Fail,
            detail: format!("{} (< {})", version_triplet_string(&found), min_version),
            required,
            remediation: remediation.map(ToOwned::to_owned),
        },
        None => CheckResult {
            name: binary.to_owned(),
            status: CheckStatus::Warn,
            detail: format!("installed at {}, version parse failed", path.display()),
            required,
            remediation: remediation.map(ToOwned::to_owned),
        },
    }
}

fn version_output(binary: &Path) -> Option<String> {
    for flag in ["--version", "-version", "-V"] {
        let Ok(output) = Command::new(binary).arg(flag).output() else {
            continue;
        };
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).to_string()
        } else {
            String::from_utf8_lossy(&output.stdout).to_string()
        };
        if !text.trim().is_empty() {
            return Some(text);
        }
    }

    None
}

fn parse_version_triplet(text: &str) -> Option<[u32; 3]> {
    let regex = Regex::new(r"(?P<a>\d+)\.(?P<b>\d+)(?:\.(?P<c>\d+))?").ok()?;
    let captures = regex.captures(text)?;

    let major = captures.name("a")?.as_str().parse::<u32>().ok()?;
    let minor = captures.name("b")?.as_str().parse::<u32>().ok()?;
    let patch = captures
        .name("c")
        .map(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(Some(0))?;

    Some([major, minor, patch])
}

fn parse_target_version(text: &str) -> [u32; 3] {
    let mut parts = text
        .split('.')
        .filter_map(|part| part.parse::<u32>().ok())
        .collect::<Vec<_>>();
    parts.resize(3, 0);
    [parts[0], parts[1], parts[2]]
}

fn version_triplet_string(value: &[u32; 3]) -> String {
    format!("{}.{}.{}", value[0], value[1], value[2])
}
