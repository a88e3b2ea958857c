//! Single-image FITS reader and writer.
//!
//! Only the primary HDU is used. The reader accepts every standard BITPIX,
//! applies BSCALE/BZERO and returns f64 counts; the writer emits f64 images
//! (BITPIX = -64) and byte masks (BITPIX = 8).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;
use tracing::debug;

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};

/// Largest axis count the FITS standard allows.
const MAX_NAXIS: i64 = 999;
use crate::error::{CalibError, Result};
use crate::frame::{Frame, FrameSource};

use super::header::{format_card, keywords, parse_card, Card, FitsHeader};

/// Read the primary image of a FITS file.
///
/// The file is mapped only for the duration of this call.
pub fn read_fits(path: &Path) -> Result<Frame> {
    let access_err = |source| CalibError::FileAccess {
        path: path.to_path_buf(),
        source,
    };
    let format_err = |reason: String| CalibError::Format {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(access_err)?;
    let len = file.metadata().map_err(access_err)?.len();
    if len == 0 {
        return Err(format_err("file is empty".into()));
    }
    // SAFETY: the mapping is read-only and dropped before returning; the
    // pipeline never writes to its own inputs while reading them.
    let mmap = unsafe { Mmap::map(&file) }.map_err(access_err)?;

    let (data, header) = parse_fits(&mmap).map_err(format_err)?;
    debug!(
        path = %path.display(),
        width = data.ncols(),
        height = data.nrows(),
        "Read FITS image"
    );

    Ok(Frame {
        data,
        header,
        source: FrameSource {
            path: Some(path.to_path_buf()),
            index: None,
        },
    })
}

/// Decode a complete FITS byte stream into its primary image and header.
pub fn parse_fits(bytes: &[u8]) -> std::result::Result<(Array2<f64>, FitsHeader), String> {
    let (header, data_offset) = parse_header(bytes)?;

    if header.get_bool(keywords::SIMPLE) != Some(true) {
        return Err("missing SIMPLE = T; not a FITS primary header".into());
    }

    let bitpix = header
        .get_int(keywords::BITPIX)
        .ok_or("missing BITPIX keyword")?;
    let naxis = header
        .get_int(keywords::NAXIS)
        .ok_or("missing NAXIS keyword")?;

    if naxis == 0 {
        return Err("no primary image array (NAXIS = 0)".into());
    }
    if naxis < 2 {
        return Err(format!("primary array has {naxis} axis, need 2"));
    }
    if naxis > MAX_NAXIS {
        return Err(format!("NAXIS = {naxis} exceeds the FITS limit of {MAX_NAXIS}"));
    }

    let mut axes = Vec::with_capacity(naxis as usize);
    for n in 1..=naxis as usize {
        let key = keywords::naxis(n);
        let len = header
            .get_int(&key)
            .ok_or_else(|| format!("missing {key} keyword"))?;
        if len <= 0 {
            return Err(format!("{key} = {len}; primary array is empty"));
        }
        let len = usize::try_from(len).map_err(|_| format!("{key} = {len} is too large"))?;
        axes.push(len);
    }
    if axes[2..].iter().any(|&len| len != 1) {
        return Err(format!("primary array is not a single 2D image (axes {axes:?})"));
    }

    let (width, height) = (axes[0], axes[1]);
    let sample_size = match bitpix {
        8 => 1,
        16 => 2,
        32 | -32 => 4,
        64 | -64 => 8,
        other => return Err(format!("unsupported BITPIX {other}")),
    };

    let data_len = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(sample_size))
        .ok_or_else(|| format!("image size overflows ({width}x{height}, BITPIX {bitpix})"))?;
    let available = bytes.len().saturating_sub(data_offset);
    if available < data_len {
        return Err(format!(
            "data truncated: expected {data_len} bytes, found {available}"
        ));
    }
    let raw = &bytes[data_offset..data_offset + data_len];

    let bscale = header.get_float(keywords::BSCALE).unwrap_or(1.0);
    let bzero = header.get_float(keywords::BZERO).unwrap_or(0.0);
    // BLANK only applies to integer data.
    let blank = if bitpix > 0 {
        header.get_int(keywords::BLANK)
    } else {
        None
    };

    let scale_int = |v: i64| -> f64 {
        if Some(v) == blank {
            f64::NAN
        } else {
            v as f64 * bscale + bzero
        }
    };

    let values: Vec<f64> = match bitpix {
        8 => raw.iter().map(|&b| scale_int(b as i64)).collect(),
        16 => raw
            .chunks_exact(2)
            .map(|c| scale_int(BigEndian::read_i16(c) as i64))
            .collect(),
        32 => raw
            .chunks_exact(4)
            .map(|c| scale_int(BigEndian::read_i32(c) as i64))
            .collect(),
        64 => raw
            .chunks_exact(8)
            .map(|c| scale_int(BigEndian::read_i64(c)))
            .collect(),
        -32 => raw
            .chunks_exact(4)
            .map(|c| BigEndian::read_f32(c) as f64 * bscale + bzero)
            .collect(),
        _ => raw
            .chunks_exact(8)
            .map(|c| BigEndian::read_f64(c) * bscale + bzero)
            .collect(),
    };

    let data = Array2::from_shape_vec((height, width), values).map_err(|e| e.to_string())?;
    Ok((data, header))
}

/// Parse header cards up to `END`. Returns the header and the byte offset of
/// the data unit (the next block boundary).
fn parse_header(bytes: &[u8]) -> std::result::Result<(FitsHeader, usize), String> {
    let mut cards: Vec<Card> = Vec::new();
    let mut offset = 0;

    loop {
        let Some(record) = bytes.get(offset..offset + FITS_CARD_SIZE) else {
            return Err("header ends without an END card".into());
        };
        offset += FITS_CARD_SIZE;

        match parse_card(record) {
            Some(card) if card.keyword == keywords::END => break,
            Some(card) => cards.push(card),
            None => {}
        }
    }

    let data_offset = offset.div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE;
    Ok((FitsHeader::from_cards(cards), data_offset))
}

/// Write a 2D array as the primary image of a FITS file (BITPIX = -64).
///
/// An existing file at `path` is overwritten. Cards in `extra` are appended
/// after the structural keywords, which are always generated here.
pub fn write_fits(path: &Path, data: &Array2<f64>, extra: &FitsHeader) -> Result<()> {
    write_primary_hdu(path, data.dim(), -64, extra, |w| {
        for &v in data.iter() {
            w.write_f64::<BigEndian>(v)?;
        }
        Ok(())
    })?;
    debug!(path = %path.display(), "Wrote FITS image");
    Ok(())
}

/// Write a boolean mask as a byte image (BITPIX = 8, 1 = true).
pub fn write_mask_fits(path: &Path, mask: &Array2<bool>, extra: &FitsHeader) -> Result<()> {
    write_primary_hdu(path, mask.dim(), 8, extra, |w| {
        for &v in mask.iter() {
            w.write_u8(u8::from(v))?;
        }
        Ok(())
    })?;
    debug!(path = %path.display(), "Wrote FITS mask");
    Ok(())
}

fn write_primary_hdu<F>(
    path: &Path,
    (height, width): (usize, usize),
    bitpix: i64,
    extra: &FitsHeader,
    write_data: F,
) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let write_err = |source| CalibError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut header = FitsHeader::new();
    header.set(keywords::SIMPLE, true);
    header.set(keywords::BITPIX, bitpix);
    header.set(keywords::NAXIS, 2);
    header.set(&keywords::naxis(1), width as i64);
    header.set(&keywords::naxis(2), height as i64);
    header.set(keywords::EXTEND, true);

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);

    let result = (|| -> std::io::Result<()> {
        let mut written = 0usize;
        let user_cards = extra.cards().iter().filter(|card| {
            !keywords::STRUCTURAL.contains(&card.keyword.as_str())
                && !keywords::is_axis(&card.keyword)
        });
        for card in header.cards().iter().chain(user_cards) {
            writer.write_all(&format_card(card))?;
            written += FITS_CARD_SIZE;
        }
        writer.write_all(&format_card(&Card {
            keyword: keywords::END.to_string(),
            value: None,
            comment: None,
        }))?;
        written += FITS_CARD_SIZE;
        pad_to_block(&mut writer, written, b' ')?;

        write_data(&mut writer)?;
        let sample_size = (bitpix.unsigned_abs() / 8) as usize;
        pad_to_block(&mut writer, width * height * sample_size, 0)?;

        writer.flush()
    })();

    result.map_err(write_err)
}

fn pad_to_block(w: &mut impl Write, written: usize, fill: u8) -> std::io::Result<()> {
    let padding = (FITS_BLOCK_SIZE - written % FITS_BLOCK_SIZE) % FITS_BLOCK_SIZE;
    w.write_all(&vec![fill; padding])
}
