use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use ndarray::Array2;
use tracing::debug;

use crate::consts::{EPSILON, PREVIEW_HIGH_PERCENTILE, PREVIEW_LOW_PERCENTILE};
use crate::error::{CalibError, Result};
use crate::frame::{ensure_shape, ChannelSet};

/// Save the three calibrated channels as an 8-bit RGB PNG quick-look.
///
/// Each channel is stretched independently between its 0.5th and 99.5th
/// percentile. Red and blue must already be aligned onto the visible channel.
pub fn save_preview_png(channels: ChannelSet<&Array2<f64>>, path: &Path) -> Result<()> {
    let shape = channels.visible.dim();
    ensure_shape(shape, channels.red.dim(), || "preview (red)".into())?;
    ensure_shape(shape, channels.blue.dim(), || "preview (blue)".into())?;

    let (h, w) = shape;
    let red = stretch(channels.red);
    let green = stretch(channels.visible);
    let blue = stretch(channels.blue);

    let mut img = RgbImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            img.put_pixel(
                col as u32,
                row as u32,
                Rgb([red[[row, col]], green[[row, col]], blue[[row, col]]]),
            );
        }
    }

    img.save_with_format(path, ImageFormat::Png)
        .map_err(|e| CalibError::Write {
            path: path.to_path_buf(),
            source: match e {
                image::ImageError::IoError(io) => io,
                other => std::io::Error::other(other),
            },
        })?;
    debug!(path = %path.display(), "Wrote preview PNG");
    Ok(())
}

/// Linear percentile stretch to 0..=255. Non-finite pixels map to black.
fn stretch(data: &Array2<f64>) -> Array2<u8> {
    let mut finite: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Array2::zeros(data.dim());
    }
    finite.sort_unstable_by(f64::total_cmp);

    let at = |p: f64| finite[((finite.len() - 1) as f64 * p).round() as usize];
    let lo = at(PREVIEW_LOW_PERCENTILE);
    let hi = at(PREVIEW_HIGH_PERCENTILE);
    let range = (hi - lo).max(EPSILON);

    data.mapv(|v| {
        if v.is_finite() {
            (((v - lo) / range).clamp(0.0, 1.0) * 255.0).round() as u8
        } else {
            0
        }
    })
}
