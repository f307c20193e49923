// SPDX-License-Identifier: GPL-3.0-only

//! Aspect ratio selection for the preview and capture streams

pub use crate::backends::camera::types::AspectRatio;

/// Pick whichever of 4:3 and 16:9 is closest to `width` x `height`.
///
/// Orientation doesn't matter: the ratio is always long side over short side.
/// An exact tie resolves to 4:3.
pub fn aspect_ratio(width: u32, height: u32) -> AspectRatio {
    AspectRatio::from_dimensions(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{RATIO_4_3_VALUE, RATIO_16_9_VALUE};

    #[test]
    fn test_common_resolutions() {
        assert_eq!(aspect_ratio(1080, 1920), AspectRatio::Ratio16_9);
        assert_eq!(aspect_ratio(1920, 1080), AspectRatio::Ratio16_9);
        assert_eq!(aspect_ratio(640, 480), AspectRatio::Ratio4_3);
        assert_eq!(aspect_ratio(3000, 4000), AspectRatio::Ratio4_3);
        assert_eq!(aspect_ratio(1, 1), AspectRatio::Ratio4_3);
        // 2:1 phone screens are closer to 16:9
        assert_eq!(aspect_ratio(1080, 2160), AspectRatio::Ratio16_9);
    }

    #[test]
    fn test_boundary() {
        // Midpoint between 4/3 and 16/9 is 14/9
        let midpoint = (RATIO_4_3_VALUE + RATIO_16_9_VALUE) / 2.0;
        assert!((midpoint - 14.0 / 9.0).abs() < 1e-12);
        assert_eq!(aspect_ratio(1399, 900), AspectRatio::Ratio4_3);
        assert_eq!(aspect_ratio(1401, 900), AspectRatio::Ratio16_9);
    }

    #[test]
    fn test_matches_distance_rule() {
        for width in (1..=64).map(|w| w * 37) {
            for height in (1..=64).map(|h| h * 23) {
                let (long, short) = (width.max(height) as f64, width.min(height) as f64);
                let ratio = long / short;
                let expected = if (ratio - RATIO_4_3_VALUE).abs()
                    <= (ratio - RATIO_16_9_VALUE).abs()
                {
                    AspectRatio::Ratio4_3
                } else {
                    AspectRatio::Ratio16_9
                };
                assert_eq!(aspect_ratio(width, height), expected, "{width}x{height}");
            }
        }
    }

    #[test]
    fn test_zero_dimension() {
        assert_eq!(aspect_ratio(0, 480), AspectRatio::Ratio4_3);
        assert_eq!(aspect_ratio(640, 0), AspectRatio::Ratio4_3);
    }
}
