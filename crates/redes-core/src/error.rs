//! Error type shared by every pipeline stage.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal pipeline failures. Malformed rows are not errors; they are skipped
/// and counted by the loader.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("column '{column}' not found in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("no usable rows left after {stage}")]
    EmptyDataset { stage: String },

    #[error("failed to export {}: {message}", path.display())]
    Export { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn export(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Export {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn empty(stage: &str) -> Self {
        Self::EmptyDataset {
            stage: stage.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
