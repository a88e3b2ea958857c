use std::path::Path;

use ndarray::Array2;
use nightcal_core::io::{write_fits, FitsHeader};

/// Small deterministic generator so synthetic fields are reproducible.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1))
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in [lo, hi).
    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// Star positions (x, y) and amplitudes, at least `min_sep` pixels apart and
/// `margin` pixels away from every edge.
pub fn random_stars(
    count: usize,
    height: usize,
    width: usize,
    margin: f64,
    min_sep: f64,
    seed: u64,
) -> Vec<(f64, f64, f64)> {
    let mut rng = Lcg::new(seed);
    let mut stars: Vec<(f64, f64, f64)> = Vec::new();
    let mut attempts = 0;
    while stars.len() < count {
        attempts += 1;
        assert!(attempts < 100_000, "could not place {count} stars");
        let x = rng.range(margin, width as f64 - margin);
        let y = rng.range(margin, height as f64 - margin);
        if stars
            .iter()
            .all(|&(sx, sy, _)| (sx - x).hypot(sy - y) >= min_sep)
        {
            let amplitude = rng.range(0.5, 1.0);
            stars.push((x, y, amplitude));
        }
    }
    stars
}

/// Render Gaussian stars (sigma 1.5 px) on a zero background with uniform
/// noise in [-noise, noise).
pub fn star_field(
    height: usize,
    width: usize,
    stars: &[(f64, f64, f64)],
    noise: f64,
    seed: u64,
) -> Array2<f64> {
    let two_sigma_sq = 2.0 * 1.5 * 1.5;
    let mut rng = Lcg::new(seed);
    Array2::from_shape_fn((height, width), |(row, col)| {
        let signal: f64 = stars
            .iter()
            .map(|&(x, y, a)| {
                let d2 = (col as f64 - x).powi(2) + (row as f64 - y).powi(2);
                a * (-d2 / two_sigma_sq).exp()
            })
            .sum();
        signal + rng.range(-noise, noise)
    })
}

/// Move every star by (dx, dy).
pub fn shift_stars(stars: &[(f64, f64, f64)], dx: f64, dy: f64) -> Vec<(f64, f64, f64)> {
    stars.iter().map(|&(x, y, a)| (x + dx, y + dy, a)).collect()
}

/// Rotate every star by `degrees` about (cx, cy).
pub fn rotate_stars(
    stars: &[(f64, f64, f64)],
    degrees: f64,
    cx: f64,
    cy: f64,
) -> Vec<(f64, f64, f64)> {
    let (sin, cos) = degrees.to_radians().sin_cos();
    stars
        .iter()
        .map(|&(x, y, a)| {
            let (px, py) = (x - cx, y - cy);
            (cx + cos * px - sin * py, cy + sin * px + cos * py, a)
        })
        .collect()
}

/// Write `arrays[i]` to `dir/<prefix>.<i padded to 8>.FIT` and return the template.
pub fn write_sequence(dir: &Path, prefix: &str, arrays: &[Array2<f64>]) -> String {
    for (i, data) in arrays.iter().enumerate() {
        let path = dir.join(format!("{prefix}.{i:08}.FIT"));
        write_fits(&path, data, &FitsHeader::new()).unwrap();
    }
    dir.join(format!("{prefix}.{{:08d}}.FIT"))
        .to_string_lossy()
        .into_owned()
}

/// `count` constant frames of `value`.
pub fn write_constant_sequence(
    dir: &Path,
    prefix: &str,
    count: usize,
    shape: (usize, usize),
    value: f64,
) -> String {
    let arrays = vec![Array2::from_elem(shape, value); count];
    write_sequence(dir, prefix, &arrays)
}

/// One 80-byte header card, space padded.
pub fn card(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    assert!(bytes.len() <= 80);
    bytes.resize(80, b' ');
    bytes
}

/// Assemble a FITS byte stream from raw cards (END is appended) and raw data.
pub fn build_fits(cards: &[&str], data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    for c in cards {
        buf.extend(card(c));
    }
    buf.extend(card("END"));
    while buf.len() % 2880 != 0 {
        buf.push(b' ');
    }
    buf.extend_from_slice(data);
    while buf.len() % 2880 != 0 {
        buf.push(0);
    }
    buf
}
