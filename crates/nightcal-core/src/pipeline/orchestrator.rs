use std::path::{Path, PathBuf};

use tracing::info;

use crate::align::{align_image, AlignedImage};
use crate::calibrate::{build_master_dark, check_compatibility, subtract_dark};
use crate::error::{CalibError, Result};
use crate::frame::{Channel, ChannelSet, Frame};
use crate::io::fits::{write_fits, write_mask_fits};
use crate::io::header::FitsHeader;
use crate::io::preview::save_preview_png;
use crate::stack::median_stack;

use super::config::PipelineConfig;
use super::types::{NoOpReporter, PipelineOutput, PipelineStage, ProgressReporter};

/// `aligned_<color>.fits` inside `dir`.
pub fn output_path(dir: &Path, channel: Channel) -> PathBuf {
    dir.join(format!("aligned_{}.fits", channel.output_name()))
}

fn footprint_path(dir: &Path, channel: Channel) -> PathBuf {
    dir.join(format!("footprint_{}.fits", channel.output_name()))
}

/// Run one stage, reporting progress and tagging any error with the stage.
fn run_stage<T>(
    reporter: &dyn ProgressReporter,
    stage: PipelineStage,
    total_items: Option<usize>,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    reporter.begin_stage(stage, total_items);
    let result = f().map_err(|e| e.in_stage(stage));
    reporter.finish_stage();
    result
}

/// Run the full calibration pipeline with a progress reporter.
///
/// Output files are only written once every channel has been calibrated and
/// aligned, so a failing run leaves the output directory untouched.
pub fn run_pipeline_reported(
    config: &PipelineConfig,
    reporter: &dyn ProgressReporter,
) -> Result<PipelineOutput> {
    config.validate()?;

    let darks = run_stage(
        reporter,
        PipelineStage::LoadingDarks,
        Some(config.darks.len()),
        || config.darks.load(),
    )?;
    let science: ChannelSet<Vec<Frame>> = config.channels.as_ref().try_map(|channel, seq| {
        run_stage(
            reporter,
            PipelineStage::LoadingChannel(channel),
            Some(seq.len()),
            || seq.load(),
        )
    })?;

    let metadata_warnings = run_stage(reporter, PipelineStage::CheckingMetadata, None, || {
        let frames: Vec<&Frame> = Channel::ALL
            .iter()
            .flat_map(|&c| science.get(c).iter())
            .collect();
        check_compatibility(&darks, &frames, &config.metadata)
    })?;

    let master_dark = run_stage(reporter, PipelineStage::ReducingDarks, None, || {
        build_master_dark(darks)
    })?;

    let calibrated: ChannelSet<_> = science.try_map(|channel, frames| {
        let reduced = run_stage(
            reporter,
            PipelineStage::ReducingChannel(channel),
            Some(frames.len()),
            || median_stack(&frames),
        )?;
        run_stage(reporter, PipelineStage::Subtracting(channel), None, || {
            subtract_dark(&reduced, &master_dark.data)
        })
    })?;

    let reference = &calibrated.visible;
    let blue = run_stage(reporter, PipelineStage::Aligning(Channel::Blue), None, || {
        align_image(&calibrated.blue, reference, &config.alignment)
    })?;
    let red = run_stage(reporter, PipelineStage::Aligning(Channel::Red), None, || {
        align_image(&calibrated.red, reference, &config.alignment)
    })?;
    let images = ChannelSet {
        red,
        blue,
        visible: AlignedImage::identity(calibrated.visible.clone()),
    };

    let out_dir = &config.output.dir;
    let mut written = Vec::new();
    let file_count = if config.output.write_footprints { 5 } else { 3 };
    run_stage(reporter, PipelineStage::Writing, Some(file_count), || {
        std::fs::create_dir_all(out_dir).map_err(|source| CalibError::Write {
            path: out_dir.clone(),
            source,
        })?;
        for channel in [Channel::Blue, Channel::Red, Channel::Visible] {
            let path = output_path(out_dir, channel);
            write_fits(&path, &images.get(channel).data, &FitsHeader::new())?;
            written.push(path);
            reporter.advance(written.len());
        }
        if config.output.write_footprints {
            for channel in [Channel::Blue, Channel::Red] {
                let path = footprint_path(out_dir, channel);
                write_mask_fits(&path, &images.get(channel).footprint, &FitsHeader::new())?;
                written.push(path);
                reporter.advance(written.len());
            }
        }
        Ok(())
    })?;

    if let Some(ref preview) = config.output.preview {
        run_stage(reporter, PipelineStage::WritingPreview, None, || {
            let data = images.as_ref().map(|_, image| &image.data);
            save_preview_png(data, preview)
        })?;
        written.push(preview.clone());
    }

    info!(
        files = written.len(),
        dir = %out_dir.display(),
        warnings = metadata_warnings.len(),
        "Calibration complete"
    );

    Ok(PipelineOutput {
        master_dark: master_dark.data,
        images,
        written,
        metadata_warnings,
    })
}

/// Run the full calibration pipeline.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutput> {
    run_pipeline_reported(config, &NoOpReporter)
}
