use std::borrow::Borrow;

use ndarray::Array2;
use tracing::debug;

use crate::error::{CalibError, Result};
use crate::frame::{ensure_shape, Frame};

/// Combine equal-shaped arrays by taking the median at each pixel position.
///
/// Even-length stacks average the two middle values. Uses
/// `select_nth_unstable` for O(n) median without a full sort.
pub fn median_combine<A: Borrow<Array2<f64>>>(arrays: &[A]) -> Result<Array2<f64>> {
    let Some(first) = arrays.first() else {
        return Err(CalibError::EmptySequence);
    };
    let (h, w) = first.borrow().dim();
    for (i, array) in arrays.iter().enumerate().skip(1) {
        ensure_shape((h, w), array.borrow().dim(), || {
            format!("median stack (frame {i})")
        })?;
    }

    let n = arrays.len();
    let mut result = Array2::<f64>::zeros((h, w));
    let mut pixel_values = vec![0.0f64; n];

    for row in 0..h {
        for col in 0..w {
            for (i, array) in arrays.iter().enumerate() {
                pixel_values[i] = array.borrow()[[row, col]];
            }
            result[[row, col]] = compute_median(&mut pixel_values);
        }
    }

    debug!(frames = n, width = w, height = h, "Median-combined stack");
    Ok(result)
}

/// Median-combine the pixel data of a frame sequence.
pub fn median_stack(frames: &[Frame]) -> Result<Array2<f64>> {
    let arrays: Vec<&Array2<f64>> = frames.iter().map(|f| &f.data).collect();
    median_combine(&arrays).map_err(|e| match e {
        CalibError::ShapeMismatch {
            expected, found, ..
        } => {
            // Name the offending file rather than its position.
            let culprit = frames
                .iter()
                .find(|f| f.data.dim() != expected)
                .map(Frame::describe)
                .unwrap_or_default();
            CalibError::ShapeMismatch {
                context: format!("median stack ({culprit})"),
                expected,
                found,
            }
        }
        other => other,
    })
}

/// Median of `values`, reordering them in place. `values` must be non-empty.
pub(crate) fn compute_median(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 1 {
        values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1
    } else {
        let mid = n / 2;
        values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
        (values[mid - 1] + values[mid]) / 2.0
    }
}
