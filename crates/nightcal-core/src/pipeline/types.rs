use std::path::PathBuf;

use ndarray::Array2;

use crate::align::AlignedImage;
use crate::frame::{Channel, ChannelSet};

/// Pipeline processing stage, used for progress reporting and error context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    LoadingDarks,
    LoadingChannel(Channel),
    CheckingMetadata,
    ReducingDarks,
    ReducingChannel(Channel),
    Subtracting(Channel),
    Aligning(Channel),
    Writing,
    WritingPreview,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoadingDarks => write!(f, "Loading dark frames"),
            Self::LoadingChannel(c) => write!(f, "Loading {c} frames"),
            Self::CheckingMetadata => write!(f, "Checking frame metadata"),
            Self::ReducingDarks => write!(f, "Median-combining dark frames"),
            Self::ReducingChannel(c) => write!(f, "Median-combining {c} frames"),
            Self::Subtracting(c) => write!(f, "Subtracting dark from {c} channel"),
            Self::Aligning(c) => write!(f, "Aligning {c} channel"),
            Self::Writing => write!(f, "Writing output"),
            Self::WritingPreview => write!(f, "Writing preview"),
        }
    }
}

/// Everything the pipeline produced.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub master_dark: Array2<f64>,
    /// Channels on the visible channel's grid; visible itself is unchanged.
    pub images: ChannelSet<AlignedImage>,
    /// Files written, in write order.
    pub written: Vec<PathBuf>,
    /// Dark/science metadata mismatches that were reported but not fatal.
    pub metadata_warnings: Vec<String>,
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
