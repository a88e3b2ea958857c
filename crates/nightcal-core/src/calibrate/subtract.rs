use ndarray::Array2;

use crate::error::Result;
use crate::frame::ensure_shape;

/// Subtract a dark reference from a reduced science frame, pixel by pixel.
///
/// Negative results are kept as they are.
pub fn subtract_dark(science: &Array2<f64>, dark: &Array2<f64>) -> Result<Array2<f64>> {
    ensure_shape(science.dim(), dark.dim(), || "dark subtraction".into())?;
    Ok(science - dark)
}
