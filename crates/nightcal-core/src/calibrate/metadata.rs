use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::{DEFAULT_EXPOSURE_TOLERANCE_S, DEFAULT_TEMPERATURE_TOLERANCE_C};
use crate::error::{CalibError, Result};
use crate::frame::Frame;

/// What to do when dark and science frames were taken under different conditions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataPolicy {
    Ignore,
    #[default]
    Warn,
    Enforce,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataCheck {
    pub policy: MetadataPolicy,
    /// Allowed exposure-time difference in seconds.
    pub exposure_tolerance: f64,
    /// Allowed sensor-temperature difference in degrees C.
    pub temperature_tolerance: f64,
}

impl Default for MetadataCheck {
    fn default() -> Self {
        Self {
            policy: MetadataPolicy::default(),
            exposure_tolerance: DEFAULT_EXPOSURE_TOLERANCE_S,
            temperature_tolerance: DEFAULT_TEMPERATURE_TOLERANCE_C,
        }
    }
}

/// Compare exposure time and sensor temperature of the first dark with every
/// science frame. Keywords missing on either side are not compared.
///
/// Returns the list of mismatches found (empty under `Ignore`). Under
/// `Enforce` the first mismatch is an error instead.
pub fn check_compatibility(
    darks: &[Frame],
    science: &[&Frame],
    check: &MetadataCheck,
) -> Result<Vec<String>> {
    if check.policy == MetadataPolicy::Ignore {
        return Ok(Vec::new());
    }
    let Some(dark) = darks.first() else {
        return Ok(Vec::new());
    };

    let mut mismatches = Vec::new();
    for frame in science {
        for reason in compare(dark, frame, check) {
            match check.policy {
                MetadataPolicy::Enforce => {
                    return Err(CalibError::MetadataMismatch {
                        frame: frame.describe(),
                        reason,
                    });
                }
                _ => {
                    warn!(frame = %frame.describe(), "{reason}");
                    mismatches.push(format!("{}: {reason}", frame.describe()));
                }
            }
        }
    }
    Ok(mismatches)
}

fn compare(dark: &Frame, frame: &Frame, check: &MetadataCheck) -> Vec<String> {
    let mut reasons = Vec::new();
    if let (Some(d), Some(s)) = (dark.exposure_time(), frame.exposure_time()) {
        if (d - s).abs() > check.exposure_tolerance {
            reasons.push(format!("exposure {s} s differs from dark exposure {d} s"));
        }
    }
    if let (Some(d), Some(s)) = (dark.sensor_temperature(), frame.sensor_temperature()) {
        if (d - s).abs() > check.temperature_tolerance {
            reasons.push(format!(
                "sensor temperature {s} C differs from dark temperature {d} C"
            ));
        }
    }
    reasons
}
