pub mod env;
pub mod paths;

pub use env::driver_env;
pub use paths::AppPaths;
