use std::fmt;
use std::path::PathBuf;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{CalibError, Result};
use crate::io::header::FitsHeader;

/// A single exposure read from disk.
/// Pixel values are raw counts (ADU) as f64, after BSCALE/BZERO.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f64>,
    /// Primary header of the file the frame came from
    pub header: FitsHeader,
    /// Where the frame was loaded from, if anywhere
    pub source: FrameSource,
}

impl Frame {
    pub fn new(data: Array2<f64>) -> Self {
        Self {
            data,
            header: FitsHeader::default(),
            source: FrameSource::default(),
        }
    }

    pub fn with_header(data: Array2<f64>, header: FitsHeader) -> Self {
        Self {
            data,
            header,
            source: FrameSource::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Exposure time in seconds, from `EXPTIME` or `EXPOSURE`.
    pub fn exposure_time(&self) -> Option<f64> {
        self.header.exposure_time()
    }

    /// Sensor temperature in degrees Celsius, from `CCD-TEMP`.
    pub fn sensor_temperature(&self) -> Option<f64> {
        self.header.sensor_temperature()
    }

    /// Human-readable name for log lines and error messages.
    pub fn describe(&self) -> String {
        match (&self.source.path, self.source.index) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(index)) => format!("frame #{index}"),
            (None, None) => "in-memory frame".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameSource {
    pub path: Option<PathBuf>,
    /// Index substituted into the path template
    pub index: Option<u64>,
}

/// Color channel of a science exposure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Blue,
    /// Visible/green channel, used as the alignment reference.
    Visible,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Blue, Channel::Visible];

    /// Color name used in output file names.
    pub fn output_name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Visible => "green",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Blue => write!(f, "blue"),
            Self::Visible => write!(f, "visible"),
        }
    }
}

/// One value per color channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelSet<T> {
    pub red: T,
    pub blue: T,
    pub visible: T,
}

impl<T> ChannelSet<T> {
    pub fn get(&self, channel: Channel) -> &T {
        match channel {
            Channel::Red => &self.red,
            Channel::Blue => &self.blue,
            Channel::Visible => &self.visible,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Channel, T) -> U) -> ChannelSet<U> {
        ChannelSet {
            red: f(Channel::Red, self.red),
            blue: f(Channel::Blue, self.blue),
            visible: f(Channel::Visible, self.visible),
        }
    }

    /// Like [`ChannelSet::map`], stopping at the first error.
    pub fn try_map<U>(
        self,
        mut f: impl FnMut(Channel, T) -> Result<U>,
    ) -> Result<ChannelSet<U>> {
        Ok(ChannelSet {
            red: f(Channel::Red, self.red)?,
            blue: f(Channel::Blue, self.blue)?,
            visible: f(Channel::Visible, self.visible)?,
        })
    }

    pub fn as_ref(&self) -> ChannelSet<&T> {
        ChannelSet {
            red: &self.red,
            blue: &self.blue,
            visible: &self.visible,
        }
    }
}

/// Fail with `ShapeMismatch` unless `found` equals `expected`.
pub(crate) fn ensure_shape(
    expected: (usize, usize),
    found: (usize, usize),
    context: impl FnOnce() -> String,
) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(CalibError::ShapeMismatch {
            context: context(),
            expected,
            found,
        })
    }
}
