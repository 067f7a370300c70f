use std::path::PathBuf;

use thiserror::Error;

/// Failures of the palette pipeline. None of them are retried; each one
/// aborts the run before any artifact is written.
#[derive(Debug, Error)]
pub enum PaletteError {
    #[error("histogram file not found: {0}")]
    MissingFile(PathBuf),

    #[error("malformed histogram {path}: {reason}")]
    CorruptFormat { path: PathBuf, reason: String },

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("no images matched pattern '{0}'")]
    NoImagesFound(String),

    #[error("unable to decode image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {path} has {pixels} pixels, {required} are sampled per image")]
    ImageTooSmall {
        path: PathBuf,
        pixels: usize,
        required: usize,
    },

    #[error("sample weights are degenerate: {0}")]
    DegenerateWeights(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("unable to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PaletteError>;

impl PaletteError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PaletteError::CorruptFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PaletteError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        PaletteError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
