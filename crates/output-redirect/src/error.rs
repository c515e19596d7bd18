use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, RedirectError>;

#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    #[error("io {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config: {0}")]
    Config(String),
    #[error("json logging is enabled but no root directory is configured")]
    MissingRootDir,
    #[error("no active session")]
    NoActiveSession,
}

impl RedirectError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
