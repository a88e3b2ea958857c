//! Star-based registration of one channel onto another.
//!
//! Detect point sources in both images, match triangle asterisms by their
//! similarity invariants, fit a similarity transform robustly, then resample
//! the target onto the reference grid.

pub mod register;
pub mod stars;
pub mod transform;
pub mod triangles;
pub mod warp;

pub use register::{align_image, find_transform, AlignedImage, AlignmentConfig};
pub use stars::{detect_stars, Star, StarDetectionConfig};
pub use transform::SimilarityTransform;
