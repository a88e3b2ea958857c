use ndarray::Array2;

use nightcal_core::calibrate::{check_compatibility, MetadataCheck, MetadataPolicy};
use nightcal_core::error::CalibError;
use nightcal_core::frame::Frame;
use nightcal_core::io::header::{keywords, FitsHeader};

fn frame(exposure: Option<f64>, temperature: Option<f64>) -> Frame {
    let mut header = FitsHeader::new();
    if let Some(e) = exposure {
        header.set(keywords::EXPTIME, e);
    }
    if let Some(t) = temperature {
        header.set(keywords::CCD_TEMP, t);
    }
    Frame::with_header(Array2::zeros((2, 2)), header)
}

fn check(policy: MetadataPolicy) -> MetadataCheck {
    MetadataCheck {
        policy,
        ..Default::default()
    }
}

#[test]
fn test_default_policy_is_warn() {
    assert_eq!(MetadataCheck::default().policy, MetadataPolicy::Warn);
}

#[test]
fn test_matching_frames_have_no_warnings() {
    let darks = vec![frame(Some(30.0), Some(-10.0))];
    let science = frame(Some(30.0), Some(-10.2));
    let warnings =
        check_compatibility(&darks, &[&science], &check(MetadataPolicy::Enforce)).unwrap();
    assert!(warnings.is_empty());
}

#[test]
fn test_warn_collects_mismatches() {
    let darks = vec![frame(Some(30.0), Some(-10.0))];
    let short = frame(Some(5.0), Some(-10.0));
    let warm = frame(Some(30.0), Some(5.0));
    let warnings =
        check_compatibility(&darks, &[&short, &warm], &check(MetadataPolicy::Warn)).unwrap();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("exposure"));
    assert!(warnings[1].contains("temperature"));
}

#[test]
fn test_enforce_rejects_mismatch() {
    let darks = vec![frame(Some(30.0), None)];
    let science = frame(Some(60.0), None);
    let err = check_compatibility(&darks, &[&science], &check(MetadataPolicy::Enforce))
        .unwrap_err();
    match err {
        CalibError::MetadataMismatch { reason, .. } => assert!(reason.contains("exposure")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_ignore_skips_checks() {
    let darks = vec![frame(Some(30.0), Some(-10.0))];
    let science = frame(Some(1.0), Some(20.0));
    let warnings =
        check_compatibility(&darks, &[&science], &check(MetadataPolicy::Ignore)).unwrap();
    assert!(warnings.is_empty());
}

#[test]
fn test_missing_keywords_are_not_compared() {
    let darks = vec![frame(None, Some(-10.0))];
    let science = frame(Some(30.0), None);
    let warnings =
        check_compatibility(&darks, &[&science], &check(MetadataPolicy::Enforce)).unwrap();
    assert!(warnings.is_empty());
}
