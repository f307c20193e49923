// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame 3A state for cameras that don't report it
//!
//! UVC webcams run exposure, white balance and focus loops in firmware and
//! expose little or nothing about their progress. The estimator watches coarse
//! frame statistics and calls a loop converged once its statistic stops moving
//! for a few consecutive frames. Hardware focus status and lens position
//! override the estimate when the driver provides them.

use super::format_converters::FrameStats;
use super::types::{AeState, AfState, AwbState, CaptureResult, LensState};

/// Frames a statistic must hold still before its loop counts as converged
pub const STABLE_FRAMES: u32 = 3;

/// Relative mean-luma change still considered settled
const LUMA_TOLERANCE: f32 = 0.02;
/// Absolute R/G and B/G change still considered settled
const GAIN_TOLERANCE: f32 = 0.02;
/// Relative sharpness change still considered settled
const SHARPNESS_TOLERANCE: f32 = 0.08;

/// Decoded `V4L2_CID_AUTO_FOCUS_STATUS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusStatus {
    Idle,
    Busy,
    Reached,
    Failed,
}

impl FocusStatus {
    /// Decode the status bitmask; BUSY wins over REACHED/FAILED
    pub fn from_bits(bits: i32) -> Self {
        const BUSY: i32 = 1 << 0;
        const REACHED: i32 = 1 << 1;
        const FAILED: i32 = 1 << 2;
        if bits & BUSY != 0 {
            FocusStatus::Busy
        } else if bits & REACHED != 0 {
            FocusStatus::Reached
        } else if bits & FAILED != 0 {
            FocusStatus::Failed
        } else {
            FocusStatus::Idle
        }
    }
}

/// What the driver told us about focus for this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HardwareFocus {
    pub status: Option<FocusStatus>,
    pub lens_position: Option<i32>,
    /// A tap-to-focus (one-shot) scan is in effect
    pub triggered: bool,
}

#[derive(Debug, Default)]
struct Settling {
    stable: u32,
}

impl Settling {
    fn observe(&mut self, settled: bool) -> bool {
        if settled {
            self.stable = self.stable.saturating_add(1);
        } else {
            self.stable = 0;
        }
        self.stable >= STABLE_FRAMES
    }

    fn reset(&mut self) {
        self.stable = 0;
    }
}

/// Turns frame statistics (and optional hardware focus data) into a
/// [`CaptureResult`] per frame.
#[derive(Debug, Default)]
pub struct ConvergenceTracker {
    previous: Option<FrameStats>,
    previous_lens: Option<i32>,
    exposure: Settling,
    white_balance: Settling,
    focus: Settling,
}

impl ConvergenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget history, e.g. after zoom or a focus request disturbed the scene
    pub fn reset(&mut self) {
        self.previous = None;
        self.exposure.reset();
        self.white_balance.reset();
        self.focus.reset();
    }

    pub fn update(&mut self, stats: FrameStats, hardware: HardwareFocus) -> CaptureResult {
        let (luma_settled, gains_settled, sharpness_settled) = match self.previous {
            Some(prev) => (
                relative_change(prev.mean_luma, stats.mean_luma) <= LUMA_TOLERANCE,
                (prev.red_gain - stats.red_gain).abs() <= GAIN_TOLERANCE
                    && (prev.blue_gain - stats.blue_gain).abs() <= GAIN_TOLERANCE,
                relative_change(prev.sharpness, stats.sharpness) <= SHARPNESS_TOLERANCE,
            ),
            None => (false, false, false),
        };
        self.previous = Some(stats);

        let ae_state = if self.exposure.observe(luma_settled) {
            AeState::Converged
        } else {
            AeState::Searching
        };
        let awb_state = if self.white_balance.observe(gains_settled) {
            AwbState::Converged
        } else {
            AwbState::Searching
        };
        let image_focused = self.focus.observe(sharpness_settled);

        let lens_moving = match (hardware.lens_position, self.previous_lens) {
            (Some(now), Some(before)) => Some(now != before),
            _ => None,
        };
        self.previous_lens = hardware.lens_position;

        let af_state = match (hardware.status, hardware.triggered) {
            (Some(FocusStatus::Busy), true) => AfState::ActiveScan,
            (Some(FocusStatus::Reached), true) => AfState::FocusedLocked,
            (Some(FocusStatus::Failed), true) => AfState::NotFocusedLocked,
            (Some(FocusStatus::Busy), false) => AfState::PassiveScan,
            (Some(FocusStatus::Reached), false) => AfState::PassiveFocused,
            (Some(FocusStatus::Failed), false) => AfState::PassiveUnfocused,
            (Some(FocusStatus::Idle), _) => AfState::Inactive,
            (None, true) if image_focused => AfState::FocusedLocked,
            (None, true) => AfState::ActiveScan,
            (None, false) if image_focused => AfState::PassiveFocused,
            (None, false) => AfState::PassiveScan,
        };

        let lens_state = match lens_moving {
            Some(true) => LensState::Moving,
            Some(false) => LensState::Stationary,
            None if matches!(af_state, AfState::PassiveScan | AfState::ActiveScan) => {
                LensState::Moving
            }
            None => LensState::Stationary,
        };

        CaptureResult {
            af_state: Some(af_state),
            ae_state: Some(ae_state),
            awb_state: Some(awb_state),
            lens_state: Some(lens_state),
        }
    }
}

fn relative_change(before: f32, now: f32) -> f32 {
    let scale = before.abs().max(now.abs()).max(1.0);
    (now - before).abs() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::readiness::capture_ready;

    fn stats(luma: f32, sharpness: f32) -> FrameStats {
        FrameStats {
            mean_luma: luma,
            red_gain: 1.0,
            blue_gain: 1.0,
            sharpness,
        }
    }

    #[test]
    fn test_focus_status_bits() {
        assert_eq!(FocusStatus::from_bits(0), FocusStatus::Idle);
        assert_eq!(FocusStatus::from_bits(1), FocusStatus::Busy);
        assert_eq!(FocusStatus::from_bits(2), FocusStatus::Reached);
        assert_eq!(FocusStatus::from_bits(4), FocusStatus::Failed);
        assert_eq!(FocusStatus::from_bits(3), FocusStatus::Busy);
    }

    #[test]
    fn test_steady_scene_converges() {
        let mut tracker = ConvergenceTracker::new();
        let first = tracker.update(stats(120.0, 30.0), HardwareFocus::default());
        assert_eq!(first.awb_state, Some(AwbState::Searching));
        assert!(!capture_ready(&first));

        let mut last = first;
        for _ in 0..STABLE_FRAMES {
            last = tracker.update(stats(120.0, 30.0), HardwareFocus::default());
        }
        assert_eq!(last.ae_state, Some(AeState::Converged));
        assert_eq!(last.af_state, Some(AfState::PassiveFocused));
        assert!(capture_ready(&last));
    }

    #[test]
    fn test_brightness_change_restarts_exposure() {
        let mut tracker = ConvergenceTracker::new();
        for _ in 0..=STABLE_FRAMES {
            tracker.update(stats(120.0, 30.0), HardwareFocus::default());
        }
        let jumped = tracker.update(stats(200.0, 30.0), HardwareFocus::default());
        assert_eq!(jumped.ae_state, Some(AeState::Searching));
    }

    #[test]
    fn test_hardware_status_overrides_estimate() {
        let mut tracker = ConvergenceTracker::new();
        let hw = HardwareFocus {
            status: Some(FocusStatus::Busy),
            lens_position: Some(10),
            triggered: false,
        };
        let result = tracker.update(stats(120.0, 30.0), hw);
        assert_eq!(result.af_state, Some(AfState::PassiveScan));
        // First position sample has nothing to compare against
        assert_eq!(result.lens_state, Some(LensState::Moving));

        let moved = tracker.update(
            stats(120.0, 30.0),
            HardwareFocus {
                lens_position: Some(14),
                ..hw
            },
        );
        assert_eq!(moved.lens_state, Some(LensState::Moving));

        let still = tracker.update(
            stats(120.0, 30.0),
            HardwareFocus {
                status: Some(FocusStatus::Reached),
                lens_position: Some(14),
                triggered: true,
            },
        );
        assert_eq!(still.af_state, Some(AfState::FocusedLocked));
        assert_eq!(still.lens_state, Some(LensState::Stationary));
    }
}
