use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use nightcal_core::calibrate::dark::{
    array_stats, build_master_dark, classify_defects, defect_persistence, histogram,
    DefectThresholds,
};
use nightcal_core::consts::DEFAULT_HISTOGRAM_BINS;
use nightcal_core::io::header::keywords;
use nightcal_core::io::{write_fits, FitsHeader, SequenceSpec};
use tracing::debug;

use crate::summary::print_dark_report;

use super::parse_range;

#[derive(Args)]
pub struct DarkArgs {
    /// Dark frame path template, e.g. "dark.{:08d}.DARK.FIT"
    pub template: String,

    /// Frame index range START-END (inclusive)
    #[arg(short, long, default_value = "0-9")]
    pub range: String,

    /// Number of histogram bins
    #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
    pub bins: usize,

    /// Ignore pixels above this value in the histogram
    #[arg(long)]
    pub upper_cut: Option<f64>,

    /// Hot pixel threshold (inclusive)
    #[arg(long, default_value = "20000")]
    pub hot: f64,

    /// Warm pixel threshold (exclusive)
    #[arg(long, default_value = "10000")]
    pub warm: f64,

    /// Print every defective pixel position
    #[arg(long)]
    pub list: bool,

    /// Write the master dark to this FITS file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &DarkArgs) -> Result<()> {
    let (start, end) = parse_range(&args.range)?;
    let spec = SequenceSpec::new(args.template.clone(), start, end);
    let frames = spec.load().context("Failed to load dark frames")?;
    let master = build_master_dark(frames)?;

    let thresholds = DefectThresholds {
        hot: args.hot,
        warm: args.warm,
    };
    let stats = array_stats(&master.data).context("Master dark has no finite pixels")?;
    let hist = histogram(&master.data, args.bins, args.upper_cut);
    let defects = classify_defects(&master.data, &thresholds);
    let persistence = defect_persistence(&defects, &master.frames, &thresholds)?;
    debug!(
        hot = defects.hot.len(),
        warm = defects.warm.len(),
        "Computed defect persistence"
    );

    print_dark_report(
        master.frame_count(),
        &stats,
        hist.as_ref(),
        &defects,
        &persistence,
        args.list,
    );

    if let Some(ref path) = args.output {
        let mut header = FitsHeader::new();
        header.set("NCOMBINE", master.frame_count() as i64);
        header.push_commentary(keywords::HISTORY, "Median of dark frames");
        write_fits(path, &master.data, &header)?;
        println!("\nMaster dark saved to {}", path.display());
    }

    Ok(())
}
