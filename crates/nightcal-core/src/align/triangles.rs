//! Triangle asterisms and their similarity invariants.
//!
//! Triangles are described by two side-length ratios, which do not change
//! under translation, rotation or uniform scaling. Matching invariants
//! between two star lists yields candidate vertex correspondences.

use std::collections::BTreeSet;

use crate::consts::MIN_TRIANGLE_SIDE;

use super::stars::Star;

/// A triangle of three sources.
#[derive(Clone, Debug, PartialEq)]
pub struct Triangle {
    /// Source indices, ordered by the length of the opposite side, longest
    /// first. Corresponding vertices of similar triangles share a position.
    pub vertices: [usize; 3],
    /// (longest / middle, middle / shortest) side ratios.
    pub invariant: [f64; 2],
}

impl Triangle {
    /// Returns `None` if any side is shorter than the degeneracy limit.
    pub fn from_points(indices: [usize; 3], points: [(f64, f64); 3]) -> Option<Self> {
        let dist = |p: (f64, f64), q: (f64, f64)| (p.0 - q.0).hypot(p.1 - q.1);
        // Side opposite vertex k.
        let mut opposite = [
            (dist(points[1], points[2]), indices[0]),
            (dist(points[0], points[2]), indices[1]),
            (dist(points[0], points[1]), indices[2]),
        ];
        if opposite.iter().any(|&(len, _)| len < MIN_TRIANGLE_SIDE) {
            return None;
        }
        opposite.sort_by(|a, b| b.0.total_cmp(&a.0));

        let [(l2, v0), (l1, v1), (l0, v2)] = opposite;
        Some(Self {
            vertices: [v0, v1, v2],
            invariant: [l2 / l1, l1 / l0],
        })
    }

    pub fn invariant_distance(&self, other: &Triangle) -> f64 {
        (self.invariant[0] - other.invariant[0]).hypot(self.invariant[1] - other.invariant[1])
    }
}

/// Build triangles from each source and its nearest neighbours.
///
/// For every source, the group of itself plus its `nearest_neighbors - 1`
/// closest sources contributes all of its 3-subsets. Duplicates across
/// groups are dropped.
pub fn build_triangles(stars: &[Star], nearest_neighbors: usize) -> Vec<Triangle> {
    let n = stars.len();
    if n < 3 {
        return Vec::new();
    }
    let group_size = nearest_neighbors.clamp(3, n);

    let mut combos: BTreeSet<[usize; 3]> = BTreeSet::new();
    for (i, star) in stars.iter().enumerate() {
        let mut by_distance: Vec<(f64, usize)> = stars
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, other)| ((other.x - star.x).hypot(other.y - star.y), j))
            .collect();
        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut group: Vec<usize> = std::iter::once(i)
            .chain(by_distance.iter().take(group_size - 1).map(|&(_, j)| j))
            .collect();
        group.sort_unstable();

        for a in 0..group.len() {
            for b in a + 1..group.len() {
                for c in b + 1..group.len() {
                    combos.insert([group[a], group[b], group[c]]);
                }
            }
        }
    }

    combos
        .into_iter()
        .filter_map(|idx| {
            let points = idx.map(|k| (stars[k].x, stars[k].y));
            Triangle::from_points(idx, points)
        })
        .collect()
}

/// All (target, reference) triangle index pairs whose invariants lie within `radius`.
pub fn match_triangles(
    target: &[Triangle],
    reference: &[Triangle],
    radius: f64,
) -> Vec<(usize, usize)> {
    let mut matches = Vec::new();
    for (ti, t) in target.iter().enumerate() {
        for (ri, r) in reference.iter().enumerate() {
            if t.invariant_distance(r) <= radius {
                matches.push((ti, ri));
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star(x: f64, y: f64) -> Star {
        Star {
            x,
            y,
            flux: 1.0,
            area: 4,
        }
    }

    #[test]
    fn invariant_ignores_rotation_and_scale() {
        let a = Triangle::from_points([0, 1, 2], [(0.0, 0.0), (4.0, 0.0), (0.0, 3.0)]).unwrap();
        // Same triangle rotated by 90 degrees and doubled.
        let b = Triangle::from_points([0, 1, 2], [(0.0, 0.0), (0.0, 8.0), (-6.0, 0.0)]).unwrap();
        assert!(a.invariant_distance(&b) < 1e-12);
        // Vertex 0 (right angle) is opposite the hypotenuse in both.
        assert_eq!(a.vertices[0], 0);
        assert_eq!(b.vertices[0], 0);
    }

    #[test]
    fn coincident_points_are_rejected() {
        assert!(Triangle::from_points([0, 1, 2], [(1.0, 1.0), (1.0, 1.0), (5.0, 2.0)]).is_none());
    }

    #[test]
    fn four_stars_give_every_triangle_once() {
        let stars = [star(0.0, 0.0), star(10.0, 0.0), star(0.0, 7.0), star(9.0, 12.0)];
        let triangles = build_triangles(&stars, 5);
        assert_eq!(triangles.len(), 4);
    }
}
