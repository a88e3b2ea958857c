//! Numbered frame sequences: path templates and all-or-nothing loading.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CalibError, Result};
use crate::frame::Frame;

use super::fits::read_fits;

/// A file path template with exactly one integer placeholder.
///
/// Placeholders follow the `format` mini-language used by observatory
/// tooling: `{}`, `{:d}`, `{:5d}` (space padded) and `{:08d}` (zero padded).
/// Literal braces are written `{{` and `}}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameTemplate {
    raw: String,
    prefix: String,
    suffix: String,
    width: Option<usize>,
    zero_pad: bool,
}

impl FrameTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let invalid = |reason: &str| CalibError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut spec: Option<String> = None;
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            let out = if spec.is_some() { &mut suffix } else { &mut prefix };
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    if spec.is_some() {
                        return Err(invalid("more than one placeholder"));
                    }
                    let mut inner = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(invalid("unterminated placeholder")),
                            Some(ch) => inner.push(ch),
                        }
                    }
                    spec = Some(inner);
                }
                '}' => return Err(invalid("unmatched '}'")),
                other => out.push(other),
            }
        }

        let spec = spec.ok_or_else(|| invalid("no '{}' placeholder for the frame index"))?;
        let (width, zero_pad) = parse_format_spec(&spec)
            .ok_or_else(|| invalid(&format!("unsupported placeholder '{{{spec}}}'")))?;

        Ok(Self {
            raw: template.to_string(),
            prefix,
            suffix,
            width,
            zero_pad,
        })
    }

    /// Substitute `index` into the template.
    ///
    /// Fails when the index needs more digits than a fixed-width placeholder allows.
    pub fn render(&self, index: u64) -> Result<PathBuf> {
        let digits = index.to_string();
        let field = match self.width {
            Some(width) if digits.len() > width => {
                return Err(CalibError::IndexOutOfRange { index, width });
            }
            Some(width) if self.zero_pad => format!("{digits:0>width$}"),
            Some(width) => format!("{digits:>width$}"),
            None => digits,
        };
        Ok(PathBuf::from(format!("{}{}{}", self.prefix, field, self.suffix)))
    }

    /// Paths for the inclusive index range `start..=end`, in ascending order.
    pub fn render_range(&self, start: u64, end: u64) -> Result<Vec<PathBuf>> {
        if start > end {
            return Err(CalibError::InvalidRange { start, end });
        }
        self.render(end)?;
        (start..=end).map(|i| self.render(i)).collect()
    }
}

/// Returns (width, zero_pad) for `""`, `":d"`, `":Nd"`, `":0Nd"` (trailing `d` optional).
fn parse_format_spec(spec: &str) -> Option<(Option<usize>, bool)> {
    if spec.is_empty() {
        return Some((None, false));
    }
    let body = spec.strip_prefix(':')?;
    let body = body.strip_suffix('d').unwrap_or(body);
    if body.is_empty() {
        return Some((None, false));
    }
    if !body.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let zero_pad = body.len() > 1 && body.starts_with('0');
    let width: usize = body.parse().ok()?;
    if width == 0 {
        return None;
    }
    Some((Some(width), zero_pad))
}

impl FromStr for FrameTemplate {
    type Err = CalibError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FrameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A frame sequence as configured: template plus inclusive index range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceSpec {
    pub template: String,
    pub start: u64,
    pub end: u64,
}

impl SequenceSpec {
    pub fn new(template: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            template: template.into(),
            start,
            end,
        }
    }

    /// Number of frames in the range (0 when `start > end`, saturating at
    /// `usize::MAX`).
    pub fn len(&self) -> usize {
        if self.start > self.end {
            return 0;
        }
        usize::try_from(self.end - self.start)
            .ok()
            .and_then(|n| n.checked_add(1))
            .unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn load(&self) -> Result<Vec<Frame>> {
        let template = FrameTemplate::parse(&self.template)?;
        load_sequence(&template, self.start, self.end)
    }
}

/// Load frames `start..=end` of a templated sequence, in ascending index order.
///
/// The widest index is rendered before any file is opened, and the first
/// failing file aborts the whole load.
pub fn load_sequence(template: &FrameTemplate, start: u64, end: u64) -> Result<Vec<Frame>> {
    if start > end {
        return Err(CalibError::InvalidRange { start, end });
    }
    template.render(end)?;
    load_indices(template, start..=end)
}

/// Load the frames whose template index is listed in `indices`, in that order.
pub fn load_frames_at(template: &FrameTemplate, indices: &[u64]) -> Result<Vec<Frame>> {
    let Some(&widest) = indices.iter().max() else {
        return Err(CalibError::EmptySequence);
    };
    template.render(widest)?;
    load_indices(template, indices.iter().copied())
}

fn load_indices(
    template: &FrameTemplate,
    indices: impl Iterator<Item = u64>,
) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    for index in indices {
        let path = template.render(index)?;
        let mut frame = read_fits(&path)?;
        frame.source.index = Some(index);
        debug!(index, path = %path.display(), "Loaded frame");
        frames.push(frame);
    }

    info!(template = %template, count = frames.len(), "Loaded frame sequence");
    Ok(frames)
}
