/// FITS logical record size in bytes. Header and data units are padded to it.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// FITS header card size in bytes.
pub const FITS_CARD_SIZE: usize = 80;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-10;

/// Scale factor turning a median absolute deviation into a Gaussian sigma.
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Default detection threshold, in noise sigmas above the background.
pub const DEFAULT_DETECTION_SIGMA: f64 = 5.0;

/// Default minimum connected area (pixels) for a point source.
pub const DEFAULT_MIN_SOURCE_AREA: usize = 3;

/// Default number of brightest sources used as control points.
pub const DEFAULT_MAX_CONTROL_POINTS: usize = 50;

/// Minimum number of sources needed to form a triangle.
pub const MIN_CONTROL_POINTS: usize = 3;

/// Each source plus its nearest neighbours form the triangle groups.
pub const DEFAULT_NEAREST_NEIGHBORS: usize = 5;

/// Maximum distance between two triangle invariants to count as a match.
pub const DEFAULT_MATCH_RADIUS: f64 = 0.1;

/// Maximum reprojection error (pixels) for a vertex to count as an inlier.
pub const DEFAULT_PIXEL_TOLERANCE: f64 = 2.0;

/// Fraction of triangle matches that must agree on a transform (capped at 10).
pub const DEFAULT_MIN_MATCHES_FRACTION: f64 = 0.8;

/// Upper bound on the inlier count demanded from the transform fit.
pub const MAX_REQUIRED_MATCHES: usize = 10;

/// Triangles with a side shorter than this (pixels) are skipped as degenerate.
pub const MIN_TRIANGLE_SIDE: f64 = 1e-3;

/// Default number of histogram bins for dark-frame statistics.
pub const DEFAULT_HISTOGRAM_BINS: usize = 200;

/// Default hot pixel threshold (ADU, inclusive).
pub const DEFAULT_HOT_THRESHOLD: f64 = 20_000.0;

/// Default warm pixel threshold (ADU, exclusive).
pub const DEFAULT_WARM_THRESHOLD: f64 = 10_000.0;

/// Default exposure-time tolerance (seconds) between darks and science frames.
pub const DEFAULT_EXPOSURE_TOLERANCE_S: f64 = 1e-3;

/// Default sensor-temperature tolerance (degrees C) between darks and science frames.
pub const DEFAULT_TEMPERATURE_TOLERANCE_C: f64 = 1.0;

/// Percentiles used to stretch the PNG preview.
pub const PREVIEW_LOW_PERCENTILE: f64 = 0.005;
pub const PREVIEW_HIGH_PERCENTILE: f64 = 0.995;
