//! Master-dark construction and dark-current analysis.
//!
//! Besides the median reference used for subtraction, a dark sequence tells
//! us which pixels are defective. Checking the individual frames separates
//! persistent defects from artifacts of the median itself.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{DEFAULT_HOT_THRESHOLD, DEFAULT_WARM_THRESHOLD};
use crate::error::{CalibError, Result};
use crate::frame::{ensure_shape, Frame};
use crate::stack::median::{compute_median, median_stack};

/// Median dark plus the frames it was reduced from.
#[derive(Clone, Debug)]
pub struct MasterDark {
    pub data: Array2<f64>,
    pub frames: Vec<Frame>,
}

impl MasterDark {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

pub fn build_master_dark(frames: Vec<Frame>) -> Result<MasterDark> {
    let data = median_stack(&frames)?;
    info!(
        frames = frames.len(),
        width = data.ncols(),
        height = data.nrows(),
        "Built master dark"
    );
    Ok(MasterDark { data, frames })
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArrayStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

/// Summary statistics over the finite pixels of `data`.
///
/// Returns `None` when there are no finite pixels.
pub fn array_stats(data: &Array2<f64>) -> Option<ArrayStats> {
    let mut values: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return None;
    }
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let median = compute_median(&mut values);
    Some(ArrayStats {
        min,
        max,
        mean,
        median,
    })
}

/// Equal-width histogram over `[lo, hi]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    pub lo: f64,
    pub hi: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.counts.len() as f64
    }

    /// `counts.len() + 1` bin edges, from `lo` to `hi`.
    pub fn bin_edges(&self) -> Vec<f64> {
        let width = self.bin_width();
        (0..=self.counts.len())
            .map(|i| self.lo + i as f64 * width)
            .collect()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Histogram of the finite pixels of `data` with `bins` bins spanning the data
/// range. When `upper_cut` is set, pixels above it are discarded first and the
/// range is taken over what remains.
///
/// The maximum value lands in the last bin. A constant input gets a unit-wide
/// range centred on the value. Returns `None` when no pixel survives.
pub fn histogram(data: &Array2<f64>, bins: usize, upper_cut: Option<f64>) -> Option<Histogram> {
    if bins == 0 {
        return None;
    }
    let values: Vec<f64> = data
        .iter()
        .copied()
        .filter(|v| v.is_finite() && upper_cut.map_or(true, |cut| *v <= cut))
        .collect();
    if values.is_empty() {
        return None;
    }

    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let scale = bins as f64 / (hi - lo);
    let mut counts = vec![0u64; bins];
    for v in values {
        let bin = (((v - lo) * scale) as usize).min(bins - 1);
        counts[bin] += 1;
    }

    Some(Histogram { lo, hi, counts })
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefectThresholds {
    /// Pixels at or above this value are hot.
    pub hot: f64,
    /// Pixels strictly between this value and `hot` are warm.
    pub warm: f64,
}

impl Default for DefectThresholds {
    fn default() -> Self {
        Self {
            hot: DEFAULT_HOT_THRESHOLD,
            warm: DEFAULT_WARM_THRESHOLD,
        }
    }
}

impl DefectThresholds {
    pub fn classify(&self, value: f64) -> Option<DefectClass> {
        if value >= self.hot {
            Some(DefectClass::Hot)
        } else if value > self.warm {
            Some(DefectClass::Warm)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefectClass {
    Hot,
    Warm,
}

/// Defective pixel positions as (row, col), in scan order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DefectMap {
    pub hot: Vec<(usize, usize)>,
    pub warm: Vec<(usize, usize)>,
    pub total_pixels: usize,
}

impl DefectMap {
    pub fn rejected_count(&self) -> usize {
        self.hot.len() + self.warm.len()
    }

    /// Share of all pixels classified hot or warm.
    pub fn rejected_fraction(&self) -> f64 {
        if self.total_pixels == 0 {
            0.0
        } else {
            self.rejected_count() as f64 / self.total_pixels as f64
        }
    }

    pub fn positions(&self, class: DefectClass) -> &[(usize, usize)] {
        match class {
            DefectClass::Hot => &self.hot,
            DefectClass::Warm => &self.warm,
        }
    }
}

pub fn classify_defects(data: &Array2<f64>, thresholds: &DefectThresholds) -> DefectMap {
    let mut map = DefectMap {
        total_pixels: data.len(),
        ..DefectMap::default()
    };
    for ((row, col), &v) in data.indexed_iter() {
        match thresholds.classify(v) {
            Some(DefectClass::Hot) => map.hot.push((row, col)),
            Some(DefectClass::Warm) => map.warm.push((row, col)),
            None => {}
        }
    }
    debug!(
        hot = map.hot.len(),
        warm = map.warm.len(),
        "Classified dark defects"
    );
    map
}

/// How consistently a defect of the master dark shows up in the individual frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Persistence {
    /// The pixel meets the defect condition in every frame.
    AllFrames,
    /// No single frame meets it; the defect only exists in the median.
    NoFrames,
    /// Some frames but not all.
    SomeFrames,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PersistenceGroups {
    pub all_frames: Vec<(usize, usize)>,
    pub no_frames: Vec<(usize, usize)>,
    pub some_frames: Vec<(usize, usize)>,
}

impl PersistenceGroups {
    fn push(&mut self, persistence: Persistence, pos: (usize, usize)) {
        match persistence {
            Persistence::AllFrames => self.all_frames.push(pos),
            Persistence::NoFrames => self.no_frames.push(pos),
            Persistence::SomeFrames => self.some_frames.push(pos),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PersistenceReport {
    pub hot: PersistenceGroups,
    pub warm: PersistenceGroups,
}

/// Check every defect of `defects` against the individual frames.
///
/// A frame "has" a defect when its own value at that position falls in the
/// same class under `thresholds`.
pub fn defect_persistence(
    defects: &DefectMap,
    frames: &[Frame],
    thresholds: &DefectThresholds,
) -> Result<PersistenceReport> {
    if frames.is_empty() {
        return Err(CalibError::EmptySequence);
    }
    let shape = frames[0].data.dim();
    for frame in &frames[1..] {
        ensure_shape(shape, frame.data.dim(), || {
            format!("defect persistence ({})", frame.describe())
        })?;
    }

    let mut report = PersistenceReport::default();
    for class in [DefectClass::Hot, DefectClass::Warm] {
        let groups = match class {
            DefectClass::Hot => &mut report.hot,
            DefectClass::Warm => &mut report.warm,
        };
        for &(row, col) in defects.positions(class) {
            let Some(hits) = frames
                .iter()
                .map(|f| f.data.get((row, col)).copied())
                .map(|v| v.map(|v| thresholds.classify(v) == Some(class)))
                .collect::<Option<Vec<bool>>>()
            else {
                return Err(CalibError::ShapeMismatch {
                    context: "defect persistence (defect outside frames)".into(),
                    expected: (row + 1, col + 1),
                    found: shape,
                });
            };
            let count = hits.iter().filter(|&&hit| hit).count();
            let persistence = if count == hits.len() {
                Persistence::AllFrames
            } else if count == 0 {
                Persistence::NoFrames
            } else {
                Persistence::SomeFrames
            };
            groups.push(persistence, (row, col));
        }
    }
    Ok(report)
}

/// Add `bias` to each dark frame, e.g. darks of increasing exposure time.
pub fn add_bias(darks: &[Frame], bias: &Frame) -> Result<Vec<Array2<f64>>> {
    darks
        .iter()
        .map(|dark| {
            ensure_shape(bias.data.dim(), dark.data.dim(), || {
                format!("bias combination ({})", dark.describe())
            })?;
            Ok(&dark.data + &bias.data)
        })
        .collect()
}
