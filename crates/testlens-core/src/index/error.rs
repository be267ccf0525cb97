//! Symbol index error types.

use std::path::PathBuf;
use thiserror::Error;

use super::{PackageRootId, TypeId};

/// Errors raised while building or querying the symbol index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// IO error.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source file could not be parsed.
    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Type handle does not belong to this index.
    #[error("Unknown type handle: {0:?}")]
    UnknownType(TypeId),

    /// Package root handle does not belong to this index.
    #[error("Unknown package root handle: {0:?}")]
    UnknownRoot(PackageRootId),

    /// Workspace root is missing or not a directory.
    #[error("Invalid workspace root: {}", .0.display())]
    InvalidRoot(PathBuf),
}

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }
}
