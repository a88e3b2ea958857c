//! Point-source detection for star-based registration.
//!
//! Pixels brighter than a robust background + k·sigma threshold are grouped
//! into 8-connected blobs; each blob large enough to be a star becomes one
//! control point at its background-subtracted, intensity-weighted centroid.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    DEFAULT_DETECTION_SIGMA, DEFAULT_MAX_CONTROL_POINTS, DEFAULT_MIN_SOURCE_AREA, EPSILON,
    MAD_TO_SIGMA,
};
use crate::stack::median::compute_median;

/// A detected point source. Coordinates are in pixels, `x` along columns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Star {
    pub x: f64,
    pub y: f64,
    /// Background-subtracted sum of the blob's pixels.
    pub flux: f64,
    /// Number of pixels in the blob.
    pub area: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarDetectionConfig {
    /// Threshold in noise sigmas above the background.
    pub sigma_threshold: f64,
    /// Blobs with fewer pixels are ignored.
    pub min_area: usize,
    /// Keep only this many of the brightest sources.
    pub max_sources: usize,
}

impl Default for StarDetectionConfig {
    fn default() -> Self {
        Self {
            sigma_threshold: DEFAULT_DETECTION_SIGMA,
            min_area: DEFAULT_MIN_SOURCE_AREA,
            max_sources: DEFAULT_MAX_CONTROL_POINTS,
        }
    }
}

/// Background level and noise sigma of an image.
///
/// Uses the median and the scaled median absolute deviation; falls back to the
/// standard deviation when more than half of the pixels share one value.
pub fn background_and_noise(data: &Array2<f64>) -> (f64, f64) {
    let mut values: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let background = compute_median(&mut values);

    let mut deviations: Vec<f64> = values.iter().map(|v| (v - background).abs()).collect();
    let sigma = MAD_TO_SIGMA * compute_median(&mut deviations);
    if sigma > EPSILON {
        return (background, sigma);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (background, var.sqrt())
}

/// Detect point sources, brightest first.
pub fn detect_stars(data: &Array2<f64>, config: &StarDetectionConfig) -> Vec<Star> {
    let (h, w) = data.dim();
    if h == 0 || w == 0 {
        return Vec::new();
    }

    let (background, sigma) = background_and_noise(data);
    let threshold = background + config.sigma_threshold * sigma;
    let mask = data.mapv(|v| v > threshold);

    let mut stars: Vec<Star> = label_blobs(&mask, data, background)
        .into_iter()
        .filter(|blob| blob.area >= config.min_area.max(1) && blob.weight > 0.0)
        .map(|blob| Star {
            x: blob.sum_x / blob.weight,
            y: blob.sum_y / blob.weight,
            flux: blob.weight,
            area: blob.area,
        })
        .collect();

    stars.sort_unstable_by(|a, b| b.flux.total_cmp(&a.flux));
    stars.truncate(config.max_sources);

    debug!(
        background,
        sigma,
        threshold,
        sources = stars.len(),
        "Detected point sources"
    );
    stars
}

#[derive(Clone, Copy, Debug, Default)]
struct Blob {
    area: usize,
    weight: f64,
    sum_x: f64,
    sum_y: f64,
}

/// Two-pass 8-connected labeling with union-find, accumulating weighted
/// moments per component.
fn label_blobs(mask: &Array2<bool>, data: &Array2<f64>, background: f64) -> Vec<Blob> {
    let (h, w) = mask.dim();
    let mut labels = Array2::<u32>::zeros((h, w));
    // Index 0 is "no label".
    let mut parent: Vec<u32> = vec![0];

    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] {
                continue;
            }

            // Already-visited neighbours: left, up-left, up, up-right.
            let mut neighbours = [0u32; 4];
            if col > 0 {
                neighbours[0] = labels[[row, col - 1]];
            }
            if row > 0 {
                if col > 0 {
                    neighbours[1] = labels[[row - 1, col - 1]];
                }
                neighbours[2] = labels[[row - 1, col]];
                if col + 1 < w {
                    neighbours[3] = labels[[row - 1, col + 1]];
                }
            }

            let smallest = neighbours.iter().copied().filter(|&l| l > 0).min();
            match smallest {
                None => {
                    let label = parent.len() as u32;
                    parent.push(label);
                    labels[[row, col]] = label;
                }
                Some(label) => {
                    labels[[row, col]] = label;
                    for &other in neighbours.iter().filter(|&&l| l > 0 && l != label) {
                        union(&mut parent, label, other);
                    }
                }
            }
        }
    }

    let mut blobs = vec![Blob::default(); parent.len()];
    for ((row, col), &label) in labels.indexed_iter() {
        if label == 0 {
            continue;
        }
        let root = find(&parent, label) as usize;
        let weight = data[[row, col]] - background;
        let blob = &mut blobs[root];
        blob.area += 1;
        blob.weight += weight;
        blob.sum_x += weight * col as f64;
        blob.sum_y += weight * row as f64;
    }

    blobs.into_iter().filter(|b| b.area > 0).collect()
}

fn find(parent: &[u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        let (small, big) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[big as usize] = small;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_pixels_form_one_blob() {
        let mut data = Array2::<f64>::zeros((6, 6));
        data[[1, 1]] = 10.0;
        data[[2, 2]] = 10.0;
        data[[3, 3]] = 10.0;
        let mask = data.mapv(|v| v > 1.0);
        let blobs = label_blobs(&mask, &data, 0.0);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 3);
    }

    #[test]
    fn v_shape_merges_through_later_row() {
        // Two arms that only meet on the bottom row.
        let mut data = Array2::<f64>::zeros((4, 5));
        for &(r, c) in &[(0, 0), (1, 1), (2, 2), (0, 4), (1, 3)] {
            data[[r, c]] = 5.0;
        }
        let mask = data.mapv(|v| v > 1.0);
        let blobs = label_blobs(&mask, &data, 0.0);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 5);
    }
}
