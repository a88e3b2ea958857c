use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use nightcal_core::calibrate::dark::array_stats;
use nightcal_core::io::read_fits;

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,

    /// Also print every header card
    #[arg(long)]
    pub header: bool,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let frame = read_fits(&args.file)?;

    println!("File:        {}", args.file.display());
    println!("Dimensions:  {}x{}", frame.width(), frame.height());
    if let Some(t) = frame.exposure_time() {
        println!("Exposure:    {t} s");
    }
    if let Some(t) = frame.sensor_temperature() {
        println!("Sensor temp: {t} C");
    }
    if let Some(kind) = frame.header.image_type() {
        println!("Image type:  {kind}");
    }
    if let Some(date) = frame.header.date_obs() {
        println!("Observed:    {date}");
    }
    if let Some(stats) = array_stats(&frame.data) {
        println!(
            "Pixels:      min {:.1}  max {:.1}  mean {:.2}  median {:.1}",
            stats.min, stats.max, stats.mean, stats.median
        );
    }

    if args.header {
        println!();
        for card in frame.header.cards() {
            match (&card.value, &card.comment) {
                (Some(v), Some(c)) => println!("{:<8} = {v} / {c}", card.keyword),
                (Some(v), None) => println!("{:<8} = {v}", card.keyword),
                (None, Some(c)) => println!("{:<8} {c}", card.keyword),
                (None, None) => println!("{}", card.keyword),
            }
        }
    }

    Ok(())
}
