use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skip,
}

impl CheckStatus {
    fn label(self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Warn => "WARN",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skip => "SKIP",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoctorState {
    Ready,
    Degraded,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
    pub required: bool,
    pub remediation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorReport {
    pub generated_at_rfc3339: String,
    pub state: DoctorState,
    pub checks: Vec<CheckResult>,
}

impl DoctorReport {
    pub fn is_launchable(&self) -> bool {
        self.state != DoctorState::Unavailable
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Launcher state: {:?}\n", self.state));
        out.push_str(&format!("Generated at:   {}\n\n", self.generated_at_rfc3339));
        out.push_str(&format!(
            "{:<18} {:<6} {:<8} {}\n",
            "CHECK", "STATUS", "REQUIRED", "DETAIL"
        ));

        for check in &self.checks {
            out.push_str(&format!(
                "{:<18} {:<6} {:<8} {}\n",
                check.name,
                check.status.label(),
                if check.required { "yes" } else { "no" },
                check.detail
            ));
            if let Some(remediation) = &check.remediation {
                out.push_str(&format!("  -> {remediation}\n"));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::{CheckResult, CheckStatus, DoctorReport, DoctorState};

    fn report(state: DoctorState) -> DoctorReport {
        DoctorReport {
            generated_at_rfc3339: "2026-10-16T00:00:00Z".to_owned(),
            state,
            checks: vec![CheckResult {
                name: "driver_script".to_owned(),
                status: CheckStatus::Fail,
                detail: "/srv/sawl/sawl_fw_run.py not found".to_owned(),
                required: true,
                remediation: Some("Set launcher.driver_script.".to_owned()),
            }],
        }
    }

    #[test]
    fn text_rendering_lists_checks_and_remediation() {
        let text = report(DoctorState::Unavailable).render_text();
        assert!(text.starts_with("Launcher state: Unavailable"));
        assert!(text.contains("driver_script      FAIL   yes"));
        assert!(text.contains("  -> Set launcher.driver_script."));
    }

    #[test]
    fn json_uses_snake_case_states() {
        let json = serde_json::to_value(report(DoctorState::Degraded)).expect("json");
        assert_eq!(json["state"], "degraded");
        assert_eq!(json["checks"][0]["status"], "fail");
    }

    #[test]
    fn only_unavailable_blocks_launch() {
        assert!(report(DoctorState::Ready).is_launchable());
        assert!(report(DoctorState::Degraded).is_launchable());
        assert!(!report(DoctorState::Unavailable).is_launchable());
    }
}
