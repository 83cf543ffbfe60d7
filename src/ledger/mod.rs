pub mod manifest;
pub mod progress;
pub mod speed;

pub use manifest::{output_dir, RunManifest, OUTPUT_FILES};
pub use progress::{survey, EpisodeProgress, EpisodeState, ProgressCounts, ProgressReport};
pub use speed::{speed_report, SpeedReport};
