use approx::assert_relative_eq;
use ndarray::Array2;

use nightcal_core::calibrate::dark::{
    add_bias, array_stats, build_master_dark, classify_defects, defect_persistence, histogram,
    DefectClass, DefectThresholds,
};
use nightcal_core::error::CalibError;
use nightcal_core::frame::Frame;

fn dark_frames() -> Vec<Frame> {
    // Floor of 1000 ADU. (1, 1) is hot in every frame, (2, 3) in two of
    // three, (4, 4) is warm everywhere.
    let mut frames = Vec::new();
    for k in 0..3 {
        let mut data = Array2::from_elem((6, 8), 1000.0);
        data[[1, 1]] = 30000.0;
        data[[2, 3]] = if k == 2 { 500.0 } else { 25000.0 };
        data[[4, 4]] = 12000.0;
        frames.push(Frame::new(data));
    }
    frames
}

#[test]
fn test_master_dark_is_median_and_keeps_frames() {
    let master = build_master_dark(dark_frames()).unwrap();
    assert_eq!(master.frame_count(), 3);
    assert_eq!(master.data[[0, 0]], 1000.0);
    assert_eq!(master.data[[2, 3]], 25000.0);
}

#[test]
fn test_stats() {
    let data = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 4.0, 100.0, f64::NAN]).unwrap();
    let stats = array_stats(&data).unwrap();
    assert_relative_eq!(stats.min, 1.0);
    assert_relative_eq!(stats.max, 100.0);
    assert_relative_eq!(stats.mean, 22.0);
    assert_relative_eq!(stats.median, 3.0);

    assert!(array_stats(&Array2::from_elem((2, 2), f64::NAN)).is_none());
}

#[test]
fn test_histogram_counts_every_pixel() {
    let data = Array2::from_shape_fn((20, 30), |(r, c)| (r * 30 + c) as f64);
    let hist = histogram(&data, 200, None).unwrap();
    assert_eq!(hist.counts.len(), 200);
    assert_eq!(hist.total(), 600);
    assert_relative_eq!(hist.lo, 0.0);
    assert_relative_eq!(hist.hi, 599.0);
    // The maximum lands in the last bin.
    assert!(hist.counts[199] >= 1);

    let edges = hist.bin_edges();
    assert_eq!(edges.len(), 201);
    assert_relative_eq!(edges[200], 599.0, epsilon = 1e-9);
}

#[test]
fn test_histogram_upper_cut_drops_bright_pixels() {
    let mut data = Array2::from_elem((10, 10), 1000.0);
    data[[0, 0]] = 1040.0;
    data[[5, 5]] = 30000.0;
    let hist = histogram(&data, 10, Some(1050.0)).unwrap();
    assert_eq!(hist.total(), 99);
    assert_relative_eq!(hist.hi, 1040.0);
}

#[test]
fn test_histogram_of_constant_data() {
    let hist = histogram(&Array2::from_elem((3, 3), 7.0), 4, None).unwrap();
    assert_relative_eq!(hist.lo, 6.5);
    assert_relative_eq!(hist.hi, 7.5);
    assert_eq!(hist.total(), 9);
}

#[test]
fn test_classification_thresholds() {
    let t = DefectThresholds::default();
    assert_eq!(t.classify(20000.0), Some(DefectClass::Hot));
    assert_eq!(t.classify(19999.0), Some(DefectClass::Warm));
    assert_eq!(t.classify(10000.0), None);
    assert_eq!(t.classify(10000.5), Some(DefectClass::Warm));
}

#[test]
fn test_defect_map_and_rejected_fraction() {
    let master = build_master_dark(dark_frames()).unwrap();
    let defects = classify_defects(&master.data, &DefectThresholds::default());
    assert_eq!(defects.hot, vec![(1, 1), (2, 3)]);
    assert_eq!(defects.warm, vec![(4, 4)]);
    assert_eq!(defects.total_pixels, 48);
    assert_relative_eq!(defects.rejected_fraction(), 3.0 / 48.0);
}

#[test]
fn test_persistence_groups() {
    let mut frames = dark_frames();
    // Warm in the median only: no single frame is warm here.
    let values = [9000.0, 15000.0, 25000.0];
    for (frame, v) in frames.iter_mut().zip(values) {
        frame.data[[0, 5]] = v;
    }
    let master = build_master_dark(frames).unwrap();
    let thresholds = DefectThresholds::default();
    let defects = classify_defects(&master.data, &thresholds);
    let report = defect_persistence(&defects, &master.frames, &thresholds).unwrap();

    assert_eq!(report.hot.all_frames, vec![(1, 1)]);
    assert_eq!(report.hot.some_frames, vec![(2, 3)]);
    assert!(report.hot.no_frames.is_empty());
    assert_eq!(report.warm.all_frames, vec![(4, 4)]);
    // 15000 in the median and in frame 1 only.
    assert_eq!(report.warm.some_frames, vec![(0, 5)]);
}

#[test]
fn test_defect_only_in_median() {
    // Values 9000 / 21000 / 21000 / 9000 average to 15000 at the middle: warm
    // in the median, but each frame is either below warm or hot.
    let frames: Vec<Frame> = [9000.0, 21000.0, 21000.0, 9000.0]
        .iter()
        .map(|&v| Frame::new(Array2::from_elem((1, 1), v)))
        .collect();
    let master = build_master_dark(frames).unwrap();
    assert_eq!(master.data[[0, 0]], 15000.0);

    let thresholds = DefectThresholds::default();
    let defects = classify_defects(&master.data, &thresholds);
    let report = defect_persistence(&defects, &master.frames, &thresholds).unwrap();
    assert_eq!(report.warm.no_frames, vec![(0, 0)]);
}

#[test]
fn test_add_bias_to_each_dark() {
    let darks: Vec<Frame> = [1.0, 5.0, 10.0]
        .iter()
        .map(|&t| Frame::new(Array2::from_elem((3, 3), 100.0 * t)))
        .collect();
    let bias = Frame::new(Array2::from_elem((3, 3), 300.0));

    let combined = add_bias(&darks, &bias).unwrap();
    let values: Vec<f64> = combined.iter().map(|a| a[[1, 1]]).collect();
    assert_eq!(values, [400.0, 800.0, 1300.0]);

    let wrong = Frame::new(Array2::zeros((2, 3)));
    assert!(matches!(
        add_bias(&darks, &wrong).unwrap_err(),
        CalibError::ShapeMismatch { .. }
    ));
}
