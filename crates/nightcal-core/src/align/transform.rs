use crate::consts::EPSILON;

/// 2D similarity transform (uniform scale, rotation, translation).
///
/// Maps a point `(x, y)` to
/// `(a·x − b·y + tx, b·x + a·y + ty)`, where `a = s·cos θ` and `b = s·sin θ`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityTransform {
    pub a: f64,
    pub b: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl SimilarityTransform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Build from scale, rotation (radians, counter-clockwise in x/y) and translation.
    pub fn from_params(scale: f64, rotation: f64, tx: f64, ty: f64) -> Self {
        Self {
            a: scale * rotation.cos(),
            b: scale * rotation.sin(),
            tx,
            ty,
        }
    }

    pub fn scale(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// Rotation angle in radians.
    pub fn rotation(&self) -> f64 {
        self.b.atan2(self.a)
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    /// Inverse mapping, or `None` for a (near) zero scale.
    pub fn inverse(&self) -> Option<Self> {
        let d = self.a * self.a + self.b * self.b;
        if d < EPSILON {
            return None;
        }
        Some(Self {
            a: self.a / d,
            b: -self.b / d,
            tx: -(self.a * self.tx + self.b * self.ty) / d,
            ty: (self.b * self.tx - self.a * self.ty) / d,
        })
    }

    /// Least-squares similarity mapping `src[i]` onto `dst[i]`.
    ///
    /// Closed form on centred coordinates. Returns `None` with fewer than two
    /// pairs or when all source points coincide.
    pub fn estimate(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<Self> {
        let n = src.len().min(dst.len());
        if n < 2 {
            return None;
        }
        let nf = n as f64;
        let centroid = |pts: &[(f64, f64)]| {
            let (sx, sy) = pts[..n]
                .iter()
                .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
            (sx / nf, sy / nf)
        };
        let (pcx, pcy) = centroid(src);
        let (qcx, qcy) = centroid(dst);

        let mut dot = 0.0;
        let mut cross = 0.0;
        let mut norm = 0.0;
        for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst).take(n) {
            let (px, py) = (sx - pcx, sy - pcy);
            let (qx, qy) = (dx - qcx, dy - qcy);
            dot += px * qx + py * qy;
            cross += px * qy - py * qx;
            norm += px * px + py * py;
        }
        if norm < EPSILON {
            return None;
        }

        let a = dot / norm;
        let b = cross / norm;
        Some(Self {
            a,
            b,
            tx: qcx - (a * pcx - b * pcy),
            ty: qcy - (b * pcx + a * pcy),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inverse_undoes_forward() {
        let t = SimilarityTransform::from_params(1.1, 0.3, 4.0, -2.5);
        let inv = t.inverse().unwrap();
        let (x, y) = t.apply(12.0, 7.0);
        let (bx, by) = inv.apply(x, y);
        assert_relative_eq!(bx, 12.0, epsilon = 1e-9);
        assert_relative_eq!(by, 7.0, epsilon = 1e-9);
    }

    #[test]
    fn estimate_recovers_exact_transform() {
        let t = SimilarityTransform::from_params(0.95, -0.2, 10.0, 3.0);
        let src = [(0.0, 0.0), (10.0, 0.0), (3.0, 8.0), (20.0, 15.0)];
        let dst: Vec<_> = src.iter().map(|&(x, y)| t.apply(x, y)).collect();
        let est = SimilarityTransform::estimate(&src, &dst).unwrap();
        assert_relative_eq!(est.scale(), 0.95, epsilon = 1e-9);
        assert_relative_eq!(est.rotation(), -0.2, epsilon = 1e-9);
        assert_relative_eq!(est.tx, 10.0, epsilon = 1e-9);
        assert_relative_eq!(est.ty, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn coincident_points_have_no_estimate() {
        let src = [(1.0, 1.0), (1.0, 1.0)];
        let dst = [(2.0, 2.0), (3.0, 3.0)];
        assert!(SimilarityTransform::estimate(&src, &dst).is_none());
    }
}
