pub mod bias;
pub mod config;
pub mod dark;
pub mod info;
pub mod pipeline;

use anyhow::{bail, Context, Result};

/// Parse an inclusive `START-END` index range (a single `N` means `N-N`).
pub fn parse_range(s: &str) -> Result<(u64, u64)> {
    let (start, end) = match s.split_once('-') {
        Some((a, b)) => (a.trim(), b.trim()),
        None => (s.trim(), s.trim()),
    };
    let start: u64 = start
        .parse()
        .with_context(|| format!("Invalid range start in {s:?}"))?;
    let end: u64 = end
        .parse()
        .with_context(|| format!("Invalid range end in {s:?}"))?;
    if start > end {
        bail!("Range {s:?} starts after it ends");
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranges() {
        assert_eq!(parse_range("0-9").unwrap(), (0, 9));
        assert_eq!(parse_range("4").unwrap(), (4, 4));
        assert!(parse_range("9-0").is_err());
        assert!(parse_range("a-3").is_err());
    }
}
