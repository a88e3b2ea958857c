use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::align::AlignmentConfig;
use crate::calibrate::MetadataCheck;
use crate::consts::MIN_CONTROL_POINTS;
use crate::error::{CalibError, Result};
use crate::frame::{Channel, ChannelSet};
use crate::io::sequence::{FrameTemplate, SequenceSpec};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub darks: SequenceSpec,
    /// Science exposures per color channel; `visible` is the alignment reference.
    pub channels: ChannelSet<SequenceSpec>,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub metadata: MetadataCheck,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            darks: SequenceSpec::new("dark.{:08d}.FIT", 0, 9),
            channels: ChannelSet {
                red: SequenceSpec::new("red.{:08d}.FIT", 0, 2),
                blue: SequenceSpec::new("blue.{:08d}.FIT", 0, 2),
                visible: SequenceSpec::new("visible.{:08d}.FIT", 0, 2),
            },
            alignment: AlignmentConfig::default(),
            metadata: MetadataCheck::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving `aligned_*.fits`; created if missing.
    pub dir: PathBuf,
    /// Also write `footprint_blue.fits` and `footprint_red.fits`.
    pub write_footprints: bool,
    /// Optional RGB PNG quick-look.
    pub preview: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            write_footprints: false,
            preview: None,
        }
    }
}

impl PipelineConfig {
    /// Check templates, ranges and numeric parameters before touching any file.
    pub fn validate(&self) -> Result<()> {
        let sequences = std::iter::once(("darks".to_string(), &self.darks)).chain(
            Channel::ALL
                .iter()
                .map(|&c| (format!("{c} channel"), self.channels.get(c))),
        );
        for (name, seq) in sequences {
            let template = FrameTemplate::parse(&seq.template)?;
            if seq.start > seq.end {
                return Err(CalibError::Config(format!(
                    "{name}: start index {} is after end index {}",
                    seq.start, seq.end
                )));
            }
            template.render(seq.end)?;
        }

        let a = &self.alignment;
        let checks = [
            (
                a.detection.sigma_threshold.is_finite() && a.detection.sigma_threshold > 0.0,
                "alignment.detection.sigma_threshold must be positive",
            ),
            (
                a.detection.max_sources >= MIN_CONTROL_POINTS,
                "alignment.detection.max_sources must be at least 3",
            ),
            (
                a.nearest_neighbors >= 3,
                "alignment.nearest_neighbors must be at least 3",
            ),
            (
                a.match_radius > 0.0,
                "alignment.match_radius must be positive",
            ),
            (
                a.pixel_tolerance > 0.0,
                "alignment.pixel_tolerance must be positive",
            ),
            (
                a.min_matches_fraction > 0.0 && a.min_matches_fraction <= 1.0,
                "alignment.min_matches_fraction must be in (0, 1]",
            ),
            (
                self.metadata.exposure_tolerance >= 0.0
                    && self.metadata.temperature_tolerance >= 0.0,
                "metadata tolerances must not be negative",
            ),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, msg)) => Err(CalibError::Config((*msg).to_string())),
            None => Ok(()),
        }
    }
}
