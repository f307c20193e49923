// SPDX-License-Identifier: GPL-3.0-only

//! Shutter gating on per-frame 3A state

use crate::backends::camera::types::{AfState, AwbState, CaptureResult, LensState};

/// Whether the shutter should accept a capture for a frame with this result.
///
/// True only while continuous AF reports the scene in focus, AWB has
/// converged and the lens is not moving. AE is not considered. The check looks
/// at a single frame; nothing carries over between frames.
pub fn capture_ready(result: &CaptureResult) -> bool {
    result.af_state == Some(AfState::PassiveFocused)
        && result.awb_state == Some(AwbState::Converged)
        && result.lens_state == Some(LensState::Stationary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::AeState;

    const AF: [Option<AfState>; 8] = [
        None,
        Some(AfState::Inactive),
        Some(AfState::PassiveScan),
        Some(AfState::PassiveFocused),
        Some(AfState::ActiveScan),
        Some(AfState::FocusedLocked),
        Some(AfState::NotFocusedLocked),
        Some(AfState::PassiveUnfocused),
    ];
    const AE: [Option<AeState>; 5] = [
        None,
        Some(AeState::Inactive),
        Some(AeState::Searching),
        Some(AeState::Converged),
        Some(AeState::Locked),
    ];
    const AWB: [Option<AwbState>; 5] = [
        None,
        Some(AwbState::Inactive),
        Some(AwbState::Searching),
        Some(AwbState::Converged),
        Some(AwbState::Locked),
    ];
    const LENS: [Option<LensState>; 3] = [None, Some(LensState::Stationary), Some(LensState::Moving)];

    #[test]
    fn test_all_none_is_not_ready() {
        assert!(!capture_ready(&CaptureResult::default()));
    }

    #[test]
    fn test_every_combination() {
        for af_state in AF {
            for ae_state in AE {
                for awb_state in AWB {
                    for lens_state in LENS {
                        let result = CaptureResult {
                            af_state,
                            ae_state,
                            awb_state,
                            lens_state,
                        };
                        let expected = af_state == Some(AfState::PassiveFocused)
                            && awb_state == Some(AwbState::Converged)
                            && lens_state == Some(LensState::Stationary);
                        assert_eq!(capture_ready(&result), expected, "{result:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_exposure_is_ignored() {
        let mut result = CaptureResult {
            af_state: Some(AfState::PassiveFocused),
            ae_state: Some(AeState::Searching),
            awb_state: Some(AwbState::Converged),
            lens_state: Some(LensState::Stationary),
        };
        assert!(capture_ready(&result));
        result.ae_state = None;
        assert!(capture_ready(&result));
    }

    #[test]
    fn test_focus_lock_blocks_shutter() {
        let result = CaptureResult {
            af_state: Some(AfState::FocusedLocked),
            ae_state: Some(AeState::Converged),
            awb_state: Some(AwbState::Converged),
            lens_state: Some(LensState::Stationary),
        };
        assert!(!capture_ready(&result));
    }
}
