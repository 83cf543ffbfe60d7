use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("toml serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary `{binary}` missing from PATH")]
    BinaryMissing { binary: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid episode id: {0}")]
    EpisodeId(String),

    #[error("invalid range: {0}")]
    Range(String),

    #[error("partition table invalid: {0}")]
    Partition(String),

    #[error("unknown worker `{0}` (not in partition table)")]
    UnknownWorker(String),

    #[error("root directory unavailable: {0}")]
    RootDir(String),

    #[error("driver launch failed: {0}")]
    Launch(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type AppResult<T> = Result<T, AppError>;
