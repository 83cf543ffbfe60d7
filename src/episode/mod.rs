pub mod catalog;
pub mod id;
pub mod index;
pub mod range;

pub use catalog::{format_missing, EpisodeCatalog, RangeResolution};
pub use id::{EpisodeCode, EpisodeDir};
pub use index::{EpisodeIndex, IndexEntry};
pub use range::EpisodeRange;
