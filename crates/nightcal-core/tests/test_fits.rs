#[allow(dead_code)]
mod common;

use approx::assert_relative_eq;
use ndarray::Array2;
use tempfile::TempDir;

use nightcal_core::error::CalibError;
use nightcal_core::io::fits::parse_fits;
use nightcal_core::io::header::keywords;
use nightcal_core::io::{read_fits, write_fits, write_mask_fits, FitsHeader};

#[test]
fn test_write_then_read_preserves_pixels_and_cards() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("img.fits");
    let data = Array2::from_shape_fn((5, 7), |(r, c)| r as f64 * 10.0 + c as f64 - 3.5);

    let mut header = FitsHeader::new();
    header.set(keywords::EXPTIME, 30.0);
    header.set(keywords::IMAGETYP, "Dark Frame");
    header.set(keywords::CCD_TEMP, -10.5);
    // Structural cards in `extra` must not override the generated ones.
    header.set(keywords::BITPIX, 16);
    write_fits(&path, &data, &header).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len() % 2880, 0);

    let frame = read_fits(&path).unwrap();
    assert_eq!(frame.data, data);
    assert_eq!(frame.width(), 7);
    assert_eq!(frame.height(), 5);
    assert_eq!(frame.header.get_int(keywords::BITPIX), Some(-64));
    assert_eq!(frame.exposure_time(), Some(30.0));
    assert_eq!(frame.sensor_temperature(), Some(-10.5));
    assert_eq!(frame.header.image_type(), Some("Dark Frame"));
    assert_eq!(frame.source.path.as_deref(), Some(path.as_path()));
}

#[test]
fn test_write_overwrites_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("img.fits");
    write_fits(&path, &Array2::from_elem((40, 40), 1.0), &FitsHeader::new()).unwrap();
    write_fits(&path, &Array2::from_elem((2, 3), 9.0), &FitsHeader::new()).unwrap();

    let frame = read_fits(&path).unwrap();
    assert_eq!(frame.data.dim(), (2, 3));
    assert!(frame.data.iter().all(|&v| v == 9.0));
}

#[test]
fn test_scaled_16_bit_data() {
    // Unsigned 16-bit stored the usual way: BZERO = 32768.
    let values: [u16; 6] = [0, 1000, 32768, 40000, 65535, 12];
    let mut raw = Vec::new();
    for v in values {
        raw.extend_from_slice(&((v as i32 - 32768) as i16).to_be_bytes());
    }
    let bytes = common::build_fits(
        &[
            "SIMPLE  =                    T",
            "BITPIX  =                   16",
            "NAXIS   =                    2",
            "NAXIS1  =                    3",
            "NAXIS2  =                    2",
            "BZERO   =              32768.0",
            "BSCALE  =                  1.0",
            "EXPTIME =                 10.0 / exposure in seconds",
            "COMMENT a commentary card",
        ],
        &raw,
    );

    let (data, header) = parse_fits(&bytes).unwrap();
    assert_eq!(data.dim(), (2, 3));
    let expected = [0.0, 1000.0, 32768.0, 40000.0, 65535.0, 12.0];
    for (got, want) in data.iter().zip(expected) {
        assert_relative_eq!(*got, want);
    }
    assert_eq!(header.exposure_time(), Some(10.0));
}

#[test]
fn test_blank_integer_pixels_become_nan() {
    let mut raw = Vec::new();
    for v in [5i32, -1, 7, 8] {
        raw.extend_from_slice(&v.to_be_bytes());
    }
    let bytes = common::build_fits(
        &[
            "SIMPLE  =                    T",
            "BITPIX  =                   32",
            "NAXIS   =                    2",
            "NAXIS1  =                    2",
            "NAXIS2  =                    2",
            "BLANK   =                   -1",
        ],
        &raw,
    );
    let (data, _) = parse_fits(&bytes).unwrap();
    assert_eq!(data[[0, 0]], 5.0);
    assert!(data[[0, 1]].is_nan());
    assert_eq!(data[[1, 1]], 8.0);
}

#[test]
fn test_degenerate_third_axis_is_accepted() {
    let raw: Vec<u8> = (0..6).collect();
    let bytes = common::build_fits(
        &[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    3",
            "NAXIS1  =                    3",
            "NAXIS2  =                    2",
            "NAXIS3  =                    1",
        ],
        &raw,
    );
    let (data, _) = parse_fits(&bytes).unwrap();
    assert_eq!(data[[1, 2]], 5.0);
}

#[test]
fn test_missing_image_array_is_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.fits");
    let bytes = common::build_fits(
        &[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    0",
        ],
        &[],
    );
    std::fs::write(&path, bytes).unwrap();

    let err = read_fits(&path).unwrap_err();
    match err {
        CalibError::Format { path: p, reason } => {
            assert_eq!(p, path);
            assert!(reason.contains("NAXIS = 0"), "{reason}");
        }
        other => panic!("expected Format error, got {other:?}"),
    }
}

#[test]
fn test_truncated_data_is_format_error() {
    let bytes = common::build_fits(
        &[
            "SIMPLE  =                    T",
            "BITPIX  =                  -64",
            "NAXIS   =                    2",
            "NAXIS1  =                  100",
            "NAXIS2  =                  100",
        ],
        &[0u8; 16],
    );
    assert!(parse_fits(&bytes).is_err());
}

#[test]
fn test_oversized_axes_are_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("huge.fits");
    let bytes = common::build_fits(
        &[
            "SIMPLE  =                    T",
            "BITPIX  =                  -64",
            "NAXIS   =                    2",
            "NAXIS1  =           4294967296",
            "NAXIS2  =           4294967296",
        ],
        &[0u8; 16],
    );
    std::fs::write(&path, bytes).unwrap();

    match read_fits(&path).unwrap_err() {
        CalibError::Format { path: p, reason } => {
            assert_eq!(p, path);
            assert!(reason.contains("overflows"), "{reason}");
        }
        other => panic!("expected Format error, got {other:?}"),
    }
}

#[test]
fn test_axis_count_above_limit_is_rejected() {
    let bytes = common::build_fits(
        &[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =          10000000000",
        ],
        &[],
    );
    let reason = parse_fits(&bytes).unwrap_err();
    assert!(reason.contains("999"), "{reason}");
}

#[test]
fn test_not_fits_is_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello, not a FITS file").unwrap();
    assert!(matches!(
        read_fits(&path).unwrap_err(),
        CalibError::Format { .. }
    ));
}

#[test]
fn test_missing_file_is_access_error() {
    let dir = TempDir::new().unwrap();
    let err = read_fits(&dir.path().join("nope.fits")).unwrap_err();
    assert!(matches!(err, CalibError::FileAccess { .. }));
}

#[test]
fn test_unwritable_path_is_write_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing_dir").join("out.fits");
    let err = write_fits(&path, &Array2::zeros((2, 2)), &FitsHeader::new()).unwrap_err();
    assert!(matches!(err, CalibError::Write { .. }));
}

#[test]
fn test_mask_is_written_as_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mask.fits");
    let mask = Array2::from_shape_fn((3, 4), |(r, c)| (r + c) % 2 == 0);
    write_mask_fits(&path, &mask, &FitsHeader::new()).unwrap();

    let frame = read_fits(&path).unwrap();
    assert_eq!(frame.header.get_int(keywords::BITPIX), Some(8));
    for ((r, c), &v) in frame.data.indexed_iter() {
        assert_eq!(v, if mask[[r, c]] { 1.0 } else { 0.0 });
    }
}

#[test]
fn test_quoted_string_with_escaped_quote() {
    let bytes = common::build_fits(
        &[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    2",
            "NAXIS1  =                    1",
            "NAXIS2  =                    1",
            "OBSERVER= 'O''Brien '           / who",
        ],
        &[1],
    );
    let (_, header) = parse_fits(&bytes).unwrap();
    assert_eq!(header.get_text("observer"), Some("O'Brien"));
}
