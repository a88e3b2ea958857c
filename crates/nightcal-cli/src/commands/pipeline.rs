use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use nightcal_core::calibrate::MetadataPolicy;
use nightcal_core::frame::ChannelSet;
use nightcal_core::io::SequenceSpec;
use nightcal_core::pipeline::{run_pipeline_reported, OutputConfig, PipelineConfig};
use tracing::debug;

use crate::progress::SpinnerReporter;
use crate::summary::{print_pipeline_summary, print_run_result};

use super::parse_range;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MetadataPolicyArg {
    Ignore,
    Warn,
    Enforce,
}

impl From<MetadataPolicyArg> for MetadataPolicy {
    fn from(arg: MetadataPolicyArg) -> Self {
        match arg {
            MetadataPolicyArg::Ignore => MetadataPolicy::Ignore,
            MetadataPolicyArg::Warn => MetadataPolicy::Warn,
            MetadataPolicyArg::Enforce => MetadataPolicy::Enforce,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Pipeline config file (TOML); other flags are ignored when given
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Dark frame path template, e.g. "dark.{:08d}.FIT"
    #[arg(long, required_unless_present = "config")]
    pub darks: Option<String>,

    /// Dark frame index range START-END (inclusive)
    #[arg(long, default_value = "0-9")]
    pub dark_range: String,

    /// Red channel path template
    #[arg(long, required_unless_present = "config")]
    pub red: Option<String>,

    /// Red frame index range START-END (inclusive)
    #[arg(long, default_value = "0-2")]
    pub red_range: String,

    /// Blue channel path template
    #[arg(long, required_unless_present = "config")]
    pub blue: Option<String>,

    /// Blue frame index range START-END (inclusive)
    #[arg(long, default_value = "0-2")]
    pub blue_range: String,

    /// Visible (green) channel path template; the alignment reference
    #[arg(long, required_unless_present = "config")]
    pub visible: Option<String>,

    /// Visible frame index range START-END (inclusive)
    #[arg(long, default_value = "0-2")]
    pub visible_range: String,

    /// Detection threshold in noise sigmas
    #[arg(long, default_value = "5.0")]
    pub sigma: f64,

    /// Reprojection tolerance for matched stars, in pixels
    #[arg(long, default_value = "2.0")]
    pub pixel_tolerance: f64,

    /// What to do when dark and science exposure/temperature differ
    #[arg(long, value_enum, default_value = "warn")]
    pub metadata: MetadataPolicyArg,

    /// Also write footprint masks for the aligned channels
    #[arg(long)]
    pub footprints: bool,

    /// Write an RGB PNG preview to this path
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        debug!(path = %config_path.display(), "Loaded pipeline config");
        toml::from_str(&contents).context("Invalid pipeline config")?
    } else {
        build_config_from_args(args)?
    };

    print_pipeline_summary(&config);

    let reporter = SpinnerReporter::new();
    let output = match run_pipeline_reported(&config, &reporter) {
        Ok(output) => {
            reporter.finish("Done");
            output
        }
        Err(e) => {
            reporter.abandon();
            return Err(e).context("Calibration pipeline failed");
        }
    };

    print_run_result(&output);
    Ok(())
}

fn sequence(template: &Option<String>, range: &str, name: &str) -> Result<SequenceSpec> {
    let template = template
        .clone()
        .with_context(|| format!("Missing {name} frame template"))?;
    let (start, end) = parse_range(range).with_context(|| format!("Invalid {name} frame range"))?;
    Ok(SequenceSpec::new(template, start, end))
}

fn build_config_from_args(args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig {
        darks: sequence(&args.darks, &args.dark_range, "dark")?,
        channels: ChannelSet {
            red: sequence(&args.red, &args.red_range, "red")?,
            blue: sequence(&args.blue, &args.blue_range, "blue")?,
            visible: sequence(&args.visible, &args.visible_range, "visible")?,
        },
        output: OutputConfig {
            dir: args.output.clone(),
            write_footprints: args.footprints,
            preview: args.preview.clone(),
        },
        ..Default::default()
    };
    config.alignment.detection.sigma_threshold = args.sigma;
    config.alignment.pixel_tolerance = args.pixel_tolerance;
    config.metadata.policy = args.metadata.into();
    Ok(config)
}
