use serde::Serialize;

use crate::episode::{EpisodeCatalog, EpisodeRange};
use crate::ledger::manifest::{output_dir, RunManifest, MANIFEST_FILE};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedReport {
    pub episodes: usize,
    pub total_audio_hours: f64,
    pub total_wall_hours: f64,
    /// Audio seconds per wall second across the whole range.
    pub overall_realtime: f64,
    pub mean_rtf: f64,
    pub median_realtime: f64,
    pub p10_realtime: f64,
    pub p90_realtime: f64,
}

struct Sample {
    duration: f64,
    elapsed: f64,
}

/// Aggregates throughput over episodes that finished cleanly with a known
/// duration. Returns `None` when nothing in `range` qualifies.
pub fn speed_report(
    catalog: &EpisodeCatalog,
    range: &EpisodeRange,
    model: &str,
) -> Option<SpeedReport> {
    let samples = catalog
        .resolve(range)
        .present
        .iter()
        .filter_map(|dir| {
            let path = output_dir(&catalog.path_for(dir), model).join(MANIFEST_FILE);
            let manifest = RunManifest::load(&path).ok()?;
            let duration = manifest.audio.duration_seconds?;
            let elapsed = manifest.run.elapsed_seconds?;
            (manifest.run.exit_code == 0 && duration > 0.0 && elapsed > 0.0)
                .then_some(Sample { duration, elapsed })
        })
        .collect::<Vec<_>>();

    if samples.is_empty() {
        return None;
    }

    let total_duration: f64 = samples.iter().map(|sample| sample.duration).sum();
    let total_elapsed: f64 = samples.iter().map(|sample| sample.elapsed).sum();
    let rtf = samples
        .iter()
        .map(|sample| sample.elapsed / sample.duration)
        .collect::<Vec<_>>();
    let mut realtime = samples
        .iter()
        .map(|sample| sample.duration / sample.elapsed)
        .collect::<Vec<_>>();
    realtime.sort_by(f64::total_cmp);

    Some(SpeedReport {
        episodes: samples.len(),
        total_audio_hours: total_duration / 3_600.0,
        total_wall_hours: total_elapsed / 3_600.0,
        overall_realtime: total_duration / total_elapsed,
        mean_rtf: rtf.iter().sum::<f64>() / rtf.len() as f64,
        median_realtime: median(&realtime),
        p10_realtime: percentile(&realtime, 10.0),
        p90_realtime: percentile(&realtime, 90.0),
    })
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Nearest-rank percentile with a rounded index.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let index = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[index.min(sorted.len() - 1)]
}

impl SpeedReport {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Episodes counted: {}\n", self.episodes));
        out.push_str(&format!("Total audio:      {:.2} hours\n", self.total_audio_hours));
        out.push_str(&format!("Total wall:       {:.2} hours\n", self.total_wall_hours));
        out.push_str(&format!("Overall speed:    {:.2}x realtime\n", self.overall_realtime));
        out.push_str(&format!("Avg RTF:          {:.4}\n", self.mean_rtf));
        out.push_str(&format!("Median xRT:       {:.2}x\n", self.median_realtime));
        out.push_str(&format!(
            "P10/P90 xRT:      {:.2}x / {:.2}x\n",
            self.p10_realtime, self.p90_realtime
        ));
        out
    }
}
