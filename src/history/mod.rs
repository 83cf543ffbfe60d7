pub mod models;
pub mod store;

pub use models::LaunchRecord;
pub use store::{render_history, HistoryStore};
