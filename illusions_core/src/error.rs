use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read engine config {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse engine config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid engine config: {0}")]
    Invalid(String),
}

/// Structural misuse of the active scene stack. These are engine bugs, not
/// content bugs; callers assert on them in debug builds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneStackError {
    #[error("active scene stack is empty")]
    Empty,
    #[error("active scene index {index} out of range (depth {depth})")]
    IndexOutOfRange { index: usize, depth: usize },
}
