use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{
    DEFAULT_MATCH_RADIUS, DEFAULT_MIN_MATCHES_FRACTION, DEFAULT_NEAREST_NEIGHBORS,
    DEFAULT_PIXEL_TOLERANCE, MAX_REQUIRED_MATCHES, MIN_CONTROL_POINTS,
};
use crate::error::{AlignmentError, Result};

use super::stars::{detect_stars, Star, StarDetectionConfig};
use super::transform::SimilarityTransform;
use super::triangles::{build_triangles, match_triangles, Triangle};
use super::warp::warp_similarity;

/// Star-matching registration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub detection: StarDetectionConfig,
    /// Group size (source plus neighbours) used to build triangles.
    pub nearest_neighbors: usize,
    /// Maximum invariant distance for two triangles to match.
    pub match_radius: f64,
    /// Reprojection tolerance in pixels.
    pub pixel_tolerance: f64,
    /// Fraction of triangle matches that must agree (capped at 10).
    pub min_matches_fraction: f64,
    /// Value written where the target has no data.
    pub fill_value: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            detection: StarDetectionConfig::default(),
            nearest_neighbors: DEFAULT_NEAREST_NEIGHBORS,
            match_radius: DEFAULT_MATCH_RADIUS,
            pixel_tolerance: DEFAULT_PIXEL_TOLERANCE,
            min_matches_fraction: DEFAULT_MIN_MATCHES_FRACTION,
            fill_value: 0.0,
        }
    }
}

impl AlignmentConfig {
    /// Inliers required for a transform given `matches` triangle matches.
    pub fn required_inliers(&self, matches: usize) -> usize {
        let wanted = (self.min_matches_fraction * matches as f64).floor() as usize;
        wanted.min(MAX_REQUIRED_MATCHES).max(1)
    }
}

/// A target resampled onto the reference grid.
#[derive(Clone, Debug)]
pub struct AlignedImage {
    pub data: Array2<f64>,
    /// `true` where the output has no source data.
    pub footprint: Array2<bool>,
    /// Target-to-reference mapping that produced `data`.
    pub transform: SimilarityTransform,
}

impl AlignedImage {
    /// The image itself with an all-valid footprint.
    pub fn identity(data: Array2<f64>) -> Self {
        let footprint = Array2::from_elem(data.dim(), false);
        Self {
            data,
            footprint,
            transform: SimilarityTransform::IDENTITY,
        }
    }

    pub fn is_fully_valid(&self) -> bool {
        self.footprint.iter().all(|&no_data| !no_data)
    }

    /// Share of output pixels backed by target data.
    pub fn valid_fraction(&self) -> f64 {
        if self.footprint.is_empty() {
            return 1.0;
        }
        let valid = self.footprint.iter().filter(|&&no_data| !no_data).count();
        valid as f64 / self.footprint.len() as f64
    }
}

/// Estimate the similarity transform mapping `target` coordinates onto `reference`.
pub fn find_transform(
    target: &Array2<f64>,
    reference: &Array2<f64>,
    config: &AlignmentConfig,
) -> std::result::Result<SimilarityTransform, AlignmentError> {
    let target_stars = detect_stars(target, &config.detection);
    let reference_stars = detect_stars(reference, &config.detection);
    for (image, stars) in [("target", &target_stars), ("reference", &reference_stars)] {
        if stars.len() < MIN_CONTROL_POINTS {
            return Err(AlignmentError::TooFewSources {
                image,
                found: stars.len(),
                required: MIN_CONTROL_POINTS,
            });
        }
    }

    let target_tris = build_triangles(&target_stars, config.nearest_neighbors);
    let reference_tris = build_triangles(&reference_stars, config.nearest_neighbors);
    let matches = match_triangles(&target_tris, &reference_tris, config.match_radius);
    debug!(
        target_triangles = target_tris.len(),
        reference_triangles = reference_tris.len(),
        matches = matches.len(),
        "Matched triangle invariants"
    );
    if matches.is_empty() {
        return Err(AlignmentError::NoTriangleMatches);
    }

    let pairs: Vec<[((f64, f64), (f64, f64)); 3]> = matches
        .iter()
        .map(|&(ti, ri)| {
            vertex_pairs(
                &target_tris[ti],
                &reference_tris[ri],
                &target_stars,
                &reference_stars,
            )
        })
        .collect();

    // Each matched triangle proposes a transform; keep the one most matches agree with.
    let mut best: Option<Vec<usize>> = None;
    for hypothesis in &pairs {
        let Some(model) = fit(hypothesis.iter()) else {
            continue;
        };
        let inliers: Vec<usize> = pairs
            .iter()
            .enumerate()
            .filter(|(_, p)| is_inlier(&model, p, config.pixel_tolerance))
            .map(|(i, _)| i)
            .collect();
        if best.as_ref().map_or(true, |b| inliers.len() > b.len()) {
            best = Some(inliers);
        }
    }

    let required = config.required_inliers(matches.len());
    let inliers = best.unwrap_or_default();
    if inliers.len() < required {
        return Err(AlignmentError::InsufficientInliers {
            inliers: inliers.len(),
            required,
        });
    }

    // Refit on every distinct vertex correspondence of the inlier matches.
    let mut correspondences: Vec<((f64, f64), (f64, f64))> = Vec::new();
    let mut seen: Vec<(usize, usize)> = Vec::new();
    for &m in &inliers {
        let (ti, ri) = matches[m];
        for k in 0..3 {
            let key = (target_tris[ti].vertices[k], reference_tris[ri].vertices[k]);
            if !seen.contains(&key) {
                seen.push(key);
                correspondences.push(pairs[m][k]);
            }
        }
    }
    let transform = fit(correspondences.iter()).ok_or(AlignmentError::DegenerateTransform {
        scale: 0.0,
    })?;
    if transform.inverse().is_none() {
        return Err(AlignmentError::DegenerateTransform {
            scale: transform.scale(),
        });
    }

    info!(
        inliers = inliers.len(),
        matches = matches.len(),
        control_points = correspondences.len(),
        scale = transform.scale(),
        rotation_deg = transform.rotation().to_degrees(),
        tx = transform.tx,
        ty = transform.ty,
        "Estimated similarity transform"
    );
    Ok(transform)
}

/// Register `target` onto `reference` and resample it onto the reference grid.
///
/// Images that are element-wise equal (and of equal shape) are returned as-is
/// with an all-valid footprint.
pub fn align_image(
    target: &Array2<f64>,
    reference: &Array2<f64>,
    config: &AlignmentConfig,
) -> Result<AlignedImage> {
    if target.dim() == reference.dim() && target == reference {
        debug!("Target equals reference, using identity");
        return Ok(AlignedImage::identity(target.clone()));
    }

    let transform = find_transform(target, reference, config)?;
    let (data, footprint) =
        warp_similarity(target, &transform, reference.dim(), config.fill_value)?;

    let aligned = AlignedImage {
        data,
        footprint,
        transform,
    };
    debug!(valid = aligned.valid_fraction(), "Resampled target");
    Ok(aligned)
}

fn vertex_pairs(
    target: &Triangle,
    reference: &Triangle,
    target_stars: &[Star],
    reference_stars: &[Star],
) -> [((f64, f64), (f64, f64)); 3] {
    std::array::from_fn(|k| {
        let t = &target_stars[target.vertices[k]];
        let r = &reference_stars[reference.vertices[k]];
        ((t.x, t.y), (r.x, r.y))
    })
}

fn fit<'a>(
    pairs: impl Iterator<Item = &'a ((f64, f64), (f64, f64))> + Clone,
) -> Option<SimilarityTransform> {
    let src: Vec<(f64, f64)> = pairs.clone().map(|p| p.0).collect();
    let dst: Vec<(f64, f64)> = pairs.map(|p| p.1).collect();
    SimilarityTransform::estimate(&src, &dst)
}

fn is_inlier(
    model: &SimilarityTransform,
    pairs: &[((f64, f64), (f64, f64)); 3],
    tolerance: f64,
) -> bool {
    pairs.iter().all(|&((sx, sy), (dx, dy))| {
        let (px, py) = model.apply(sx, sy);
        (px - dx).hypot(py - dy) <= tolerance
    })
}
