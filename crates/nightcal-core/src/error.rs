use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::PipelineStage;

#[derive(Error, Debug)]
pub enum CalibError {
    #[error("Cannot read {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid FITS file {}: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    #[error(
        "Shape mismatch in {context}: expected {}x{}, got {}x{}",
        .expected.1, .expected.0, .found.1, .found.0
    )]
    ShapeMismatch {
        context: String,
        /// (rows, cols)
        expected: (usize, usize),
        /// (rows, cols)
        found: (usize, usize),
    },

    #[error("Alignment failed: {0}")]
    Alignment(#[from] AlignmentError),

    #[error("Cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid frame template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Invalid frame range {start}..={end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("Frame index {index} does not fit in {width} digits")]
    IndexOutOfRange { index: u64, width: usize },

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Metadata mismatch for {frame}: {reason}")]
    MetadataMismatch { frame: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: PipelineStage,
        source: Box<CalibError>,
    },
}

impl CalibError {
    /// The underlying error with any stage wrappers removed.
    pub fn root(&self) -> &CalibError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn in_stage(self, stage: PipelineStage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }
}

/// Reasons a target image could not be registered onto a reference.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("found {found} point sources in the {image} image, need at least {required}")]
    TooFewSources {
        image: &'static str,
        found: usize,
        required: usize,
    },

    #[error("no star triangles in common between target and reference")]
    NoTriangleMatches,

    #[error("best transform explains {inliers} triangle matches, need {required}")]
    InsufficientInliers { inliers: usize, required: usize },

    #[error("estimated transform is degenerate (scale {scale:.3e})")]
    DegenerateTransform { scale: f64 },
}

pub type Result<T> = std::result::Result<T, CalibError>;
