use ndarray::Array2;

use crate::error::AlignmentError;

use super::transform::SimilarityTransform;

/// Tolerance for points landing a hair outside the source grid.
const EDGE_EPS: f64 = 1e-9;

/// Resample `target` onto an output grid of `shape` (rows, cols).
///
/// `transform` maps target pixel coordinates to output coordinates; each
/// output pixel is pulled from the target through its inverse. Output pixels
/// whose source lies outside the target get `fill_value` and are marked
/// `true` in the returned footprint.
pub fn warp_similarity(
    target: &Array2<f64>,
    transform: &SimilarityTransform,
    shape: (usize, usize),
    fill_value: f64,
) -> Result<(Array2<f64>, Array2<bool>), AlignmentError> {
    let inverse = transform
        .inverse()
        .ok_or(AlignmentError::DegenerateTransform {
            scale: transform.scale(),
        })?;

    let (h, w) = target.dim();
    let max_x = w as f64 - 1.0;
    let max_y = h as f64 - 1.0;

    let mut data = Array2::<f64>::from_elem(shape, fill_value);
    let mut footprint = Array2::<bool>::from_elem(shape, true);

    for ((row, col), out) in data.indexed_iter_mut() {
        let (sx, sy) = inverse.apply(col as f64, row as f64);
        if sx < -EDGE_EPS || sy < -EDGE_EPS || sx > max_x + EDGE_EPS || sy > max_y + EDGE_EPS {
            continue;
        }
        *out = bilinear_sample(target, sy.clamp(0.0, max_y), sx.clamp(0.0, max_x));
        footprint[[row, col]] = false;
    }

    Ok((data, footprint))
}

/// Bilinear interpolation at (y, x), which must lie inside the grid.
pub fn bilinear_sample(data: &Array2<f64>, y: f64, x: f64) -> f64 {
    let (h, w) = data.dim();

    let x0 = (x.floor() as usize).min(w - 1);
    let y0 = (y.floor() as usize).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);

    let fx = (x - x0 as f64).clamp(0.0, 1.0);
    let fy = (y - y0 as f64).clamp(0.0, 1.0);

    let v00 = data[[y0, x0]];
    let v10 = data[[y0, x1]];
    let v01 = data[[y1, x0]];
    let v11 = data[[y1, x1]];

    // Skip zero-weight taps so a NaN neighbour does not leak into exact samples.
    let mut acc = 0.0;
    for (v, wgt) in [
        (v00, (1.0 - fx) * (1.0 - fy)),
        (v10, fx * (1.0 - fy)),
        (v01, (1.0 - fx) * fy),
        (v11, fx * fy),
    ] {
        if wgt > 0.0 {
            acc += v * wgt;
        }
    }
    acc
}
