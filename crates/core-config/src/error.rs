//! Configuration-layer errors.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{} is not owned by a valid user", path.display())]
    FileOwner { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
