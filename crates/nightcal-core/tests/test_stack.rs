use approx::assert_relative_eq;
use ndarray::Array2;

use nightcal_core::error::CalibError;
use nightcal_core::frame::Frame;
use nightcal_core::stack::{median_combine, median_stack};

#[test]
fn test_constant_sequence_reduces_to_constant() {
    let frames: Vec<Array2<f64>> = (0..5).map(|_| Array2::from_elem((10, 12), 10.0)).collect();
    let result = median_combine(&frames).unwrap();
    assert_eq!(result.dim(), (10, 12));
    assert!(result.iter().all(|&v| v == 10.0));
}

#[test]
fn test_median_rejects_single_outlier() {
    // A cosmic-ray hit in one frame does not survive the median.
    let mut frames: Vec<Array2<f64>> = (0..3).map(|_| Array2::from_elem((4, 4), 100.0)).collect();
    frames[1][[2, 2]] = 60000.0;
    let result = median_combine(&frames).unwrap();
    assert_relative_eq!(result[[2, 2]], 100.0);
}

#[test]
fn test_even_count_averages_middle_values() {
    let frames: Vec<Array2<f64>> = [1.0, 9.0, 3.0, 5.0]
        .iter()
        .map(|&v| Array2::from_elem((2, 2), v))
        .collect();
    let result = median_combine(&frames).unwrap();
    assert_relative_eq!(result[[0, 0]], 4.0);
}

#[test]
fn test_single_frame_is_returned_unchanged() {
    let data = Array2::from_shape_fn((3, 5), |(r, c)| (r * 5 + c) as f64);
    let result = median_combine(std::slice::from_ref(&data)).unwrap();
    assert_eq!(result, data);
}

#[test]
fn test_empty_sequence_is_rejected() {
    let frames: Vec<Array2<f64>> = Vec::new();
    assert!(matches!(
        median_combine(&frames).unwrap_err(),
        CalibError::EmptySequence
    ));
}

#[test]
fn test_shape_mismatch_is_rejected() {
    let frames = vec![
        Frame::new(Array2::zeros((10, 10))),
        Frame::new(Array2::zeros((10, 10))),
        Frame::new(Array2::zeros((10, 11))),
    ];
    match median_stack(&frames).unwrap_err() {
        CalibError::ShapeMismatch {
            expected, found, ..
        } => {
            assert_eq!(expected, (10, 10));
            assert_eq!(found, (10, 11));
        }
        other => panic!("expected ShapeMismatch, got {other:?}"),
    }
}
