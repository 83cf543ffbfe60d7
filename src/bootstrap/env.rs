/// Environment applied to the driver process on top of the inherited one.
///
/// The driver prints per-episode progress; unbuffered output keeps it in step
/// with the launcher's own log lines when both share a terminal.
pub fn driver_env() -> Vec<(&'static str, String)> {
    vec![
        ("PYTHONUNBUFFERED", "1".to_owned()),
        ("PYTHONIOENCODING", "utf-8".to_owned()),
    ]
}
