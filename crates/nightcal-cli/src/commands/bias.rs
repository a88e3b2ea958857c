use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use nightcal_core::calibrate::dark::{add_bias, array_stats};
use nightcal_core::io::header::keywords;
use nightcal_core::io::{load_frames_at, read_fits, write_fits, FitsHeader, FrameTemplate};

#[derive(Args)]
pub struct BiasArgs {
    /// Dark frame template with the exposure time as placeholder,
    /// e.g. "dark_frame_{:d}_sec.DARK.FIT"
    pub template: String,

    /// Comma-separated exposure times substituted into the template
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub exposures: Vec<u64>,

    /// Bias frame
    #[arg(short, long)]
    pub bias: PathBuf,

    /// Output template for the combined frames, e.g. "dark_bias_{:d}.fits"
    #[arg(short, long)]
    pub output: Option<String>,
}

pub fn run(args: &BiasArgs) -> Result<()> {
    if args.exposures.is_empty() {
        bail!("No exposure times given");
    }
    let template: FrameTemplate = args.template.parse()?;
    let output_template = args
        .output
        .as_deref()
        .map(str::parse::<FrameTemplate>)
        .transpose()
        .context("Invalid output template")?;

    let darks = load_frames_at(&template, &args.exposures).context("Failed to load dark frames")?;
    let bias = read_fits(&args.bias)?;
    let combined = add_bias(&darks, &bias)?;

    println!("{:>10}  {:>10}  {:>10}  {:>10}", "Exposure", "Min", "Median", "Max");
    for (&exposure, data) in args.exposures.iter().zip(&combined) {
        if let Some(stats) = array_stats(data) {
            println!(
                "{:>9}s  {:>10.1}  {:>10.1}  {:>10.1}",
                exposure, stats.min, stats.median, stats.max
            );
        }
        if let Some(ref out) = output_template {
            let path = out.render(exposure)?;
            let mut header = FitsHeader::new();
            header.set(keywords::EXPTIME, exposure as f64);
            header.push_commentary(keywords::HISTORY, "Dark frame plus bias frame");
            write_fits(&path, data, &header)?;
            println!("  -> {}", path.display());
        }
    }

    Ok(())
}
