// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use chrono::{Local, TimeZone};
use viewfinder::constants::*;

#[test]
fn test_filename_format_sorts_by_time() {
    let earlier = Local.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
    let later = Local.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();

    let a = earlier.format(FILENAME_FORMAT).to_string();
    let b = later.format(FILENAME_FORMAT).to_string();
    assert_eq!(a, "2024-03-09-23-59-59-000");
    assert!(a < b, "File names should sort in capture order");
}

#[test]
fn test_timing_constants() {
    assert_eq!(FOCUS_AUTO_CANCEL.as_secs(), 3);
    assert_eq!(ANIMATION_SLOW_MILLIS, 100);
    assert_eq!(ANIMATION_FAST_MILLIS, 50);
    assert!(TOAST_SHORT < TOAST_LONG);
    assert!(CLI_READY_TIMEOUT.as_secs() <= 5);
}

#[test]
fn test_ratio_values() {
    assert!(RATIO_4_3_VALUE < RATIO_16_9_VALUE);
    assert_eq!(PHOTO_EXTENSION, ".jpg");
    assert!(MAX_DIGITAL_ZOOM > 1.0);
}
