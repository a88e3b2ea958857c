use console::Style;
use nightcal_core::calibrate::dark::{
    ArrayStats, DefectMap, Histogram, PersistenceGroups, PersistenceReport,
};
use nightcal_core::calibrate::MetadataPolicy;
use nightcal_core::frame::Channel;
use nightcal_core::io::SequenceSpec;
use nightcal_core::pipeline::{PipelineConfig, PipelineOutput};

/// Width of the text histogram bars.
const HISTOGRAM_BAR_WIDTH: usize = 40;
/// Histogram bins are merged down to this many rows for display.
const HISTOGRAM_ROWS: usize = 20;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    warn: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            warn: Style::new().yellow().bold(),
        }
    }
}

fn sequence_line(seq: &SequenceSpec) -> String {
    format!("{} [{}..={}] ({} frames)", seq.template, seq.start, seq.end, seq.len())
}

pub fn print_pipeline_summary(config: &PipelineConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("nightcal Pipeline"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(17)));
    println!();

    println!("  {}", s.header.apply_to("Inputs"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Darks"),
        s.path.apply_to(sequence_line(&config.darks))
    );
    for channel in Channel::ALL {
        println!(
            "    {:<12}{}",
            s.label.apply_to(channel.to_string()),
            s.path.apply_to(sequence_line(config.channels.get(channel)))
        );
    }
    println!();

    let a = &config.alignment;
    println!("  {}", s.header.apply_to("Alignment"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Method"),
        s.method.apply_to("star triangles, similarity")
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Detection"),
        s.value.apply_to(format!(
            "{} sigma, min area {}, max {} stars",
            a.detection.sigma_threshold, a.detection.min_area, a.detection.max_sources
        ))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Tolerance"),
        s.value.apply_to(format!("{} px", a.pixel_tolerance))
    );
    println!();

    println!("  {}", s.header.apply_to("Output"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Directory"),
        s.path.apply_to(config.output.dir.display())
    );
    let metadata = match config.metadata.policy {
        MetadataPolicy::Ignore => s.disabled.apply_to("ignored".to_string()),
        MetadataPolicy::Warn => s.method.apply_to("warn".to_string()),
        MetadataPolicy::Enforce => s.method.apply_to("enforce".to_string()),
    };
    println!("    {:<12}{}", s.label.apply_to("Metadata"), metadata);
    if config.output.write_footprints {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Footprints"),
            s.method.apply_to("enabled")
        );
    }
    if let Some(ref preview) = config.output.preview {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Preview"),
            s.path.apply_to(preview.display())
        );
    }
    println!();
}

pub fn print_run_result(output: &PipelineOutput) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Alignment"));
    for channel in [Channel::Blue, Channel::Red] {
        let image = output.images.get(channel);
        let t = &image.transform;
        println!(
            "    {:<12}{}",
            s.label.apply_to(channel.to_string()),
            s.value.apply_to(format!(
                "shift ({:+.2}, {:+.2}) px, rotation {:+.3} deg, scale {:.4}, {:.1}% covered",
                t.tx,
                t.ty,
                t.rotation().to_degrees(),
                t.scale(),
                image.valid_fraction() * 100.0
            ))
        );
    }

    if !output.metadata_warnings.is_empty() {
        println!();
        println!("  {}", s.warn.apply_to("Metadata warnings"));
        for w in &output.metadata_warnings {
            println!("    {}", w);
        }
    }

    println!();
    println!("  {}", s.header.apply_to("Written"));
    for path in &output.written {
        println!("    {}", s.path.apply_to(path.display()));
    }
    println!();
}

pub fn print_dark_report(
    frame_count: usize,
    stats: &ArrayStats,
    hist: Option<&Histogram>,
    defects: &DefectMap,
    persistence: &PersistenceReport,
    list: bool,
) {
    let s = Styles::new();

    println!();
    println!(
        "  {}",
        s.title.apply_to(format!("Master dark ({frame_count} frames)"))
    );
    println!();
    for (label, v) in [
        ("Min", stats.min),
        ("Max", stats.max),
        ("Mean", stats.mean),
        ("Median", stats.median),
    ] {
        println!(
            "    {:<12}{}",
            s.label.apply_to(label),
            s.value.apply_to(format!("{v:.2}"))
        );
    }

    if let Some(hist) = hist {
        println!();
        println!("  {}", s.header.apply_to("Histogram"));
        print_histogram(&s, hist);
    }

    println!();
    println!("  {}", s.header.apply_to("Defects"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Hot"),
        s.value.apply_to(defects.hot.len())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Warm"),
        s.value.apply_to(defects.warm.len())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Rejected"),
        s.value
            .apply_to(format!("{:.4}%", defects.rejected_fraction() * 100.0))
    );

    println!();
    println!("  {}", s.header.apply_to("Persistence"));
    print_persistence(&s, "Hot", &persistence.hot, list);
    print_persistence(&s, "Warm", &persistence.warm, list);
}

fn print_persistence(s: &Styles, label: &str, groups: &PersistenceGroups, list: bool) {
    for (kind, positions) in [
        ("in all frames", &groups.all_frames),
        ("in some frames", &groups.some_frames),
        ("median only", &groups.no_frames),
    ] {
        println!(
            "    {:<22}{}",
            s.label.apply_to(format!("{label} {kind}")),
            s.value.apply_to(positions.len())
        );
        if list {
            for (row, col) in positions {
                println!("      ({row}, {col})");
            }
        }
    }
}

fn print_histogram(s: &Styles, hist: &Histogram) {
    let group = hist.counts.len().div_ceil(HISTOGRAM_ROWS).max(1);
    let rows: Vec<(f64, u64)> = hist
        .counts
        .chunks(group)
        .enumerate()
        .map(|(i, c)| (hist.lo + (i * group) as f64 * hist.bin_width(), c.iter().sum()))
        .collect();
    // Log-scaled bar lengths.
    let peak = rows.iter().map(|&(_, n)| n).max().unwrap_or(0);
    let scale = ((peak + 1) as f64).ln().max(f64::MIN_POSITIVE);
    for (lo, n) in rows {
        let len = (((n + 1) as f64).ln() / scale * HISTOGRAM_BAR_WIDTH as f64).round() as usize;
        println!(
            "    {:>12.1} {} {}",
            s.label.apply_to(lo),
            s.method.apply_to("\u{2588}".repeat(len)),
            s.label.apply_to(n)
        );
    }
}
