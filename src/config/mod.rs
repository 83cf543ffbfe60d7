pub mod load;
pub mod schema;

pub use load::{load_config, CliOverrides, ConfigSource};
pub use schema::{AppConfig, DriverTask, LauncherConfig, RunConfig};
