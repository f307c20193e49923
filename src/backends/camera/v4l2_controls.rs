// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera control interface
//!
//! Raw `VIDIOC_*CTRL` ioctls for the controls the viewfinder drives: zoom,
//! focus (continuous, one-shot and status), spot metering and the flash LED.
//! The v4l crate covers streaming; controls go through libc directly so a
//! control can be poked from any thread without sharing the stream handle.
//!
//! Inspired by [cameractrls](https://github.com/soyersoyer/cameractrls).

use std::fs::File;
use std::os::unix::io::AsRawFd;
use tracing::{debug, warn};

// ===== V4L2 Control Class Bases =====
const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a0000;
const V4L2_CTRL_CLASS_FLASH: u32 = 0x009c0000;

const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;
const V4L2_CID_FLASH_CLASS_BASE: u32 = V4L2_CTRL_CLASS_FLASH | 0x900;

// ===== V4L2 Control IDs (Camera Class) =====

/// Lens position for manual focus; read back to detect lens motion
pub const V4L2_CID_FOCUS_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 10;
/// Continuous autofocus enable
pub const V4L2_CID_FOCUS_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 12;
/// Optical/hardware zoom position
pub const V4L2_CID_ZOOM_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 13;
/// Exposure metering mode
pub const V4L2_CID_EXPOSURE_METERING: u32 = V4L2_CID_CAMERA_CLASS_BASE + 25;
/// Start a single autofocus scan (button)
pub const V4L2_CID_AUTO_FOCUS_START: u32 = V4L2_CID_CAMERA_CLASS_BASE + 28;
/// Abort a single autofocus scan (button)
pub const V4L2_CID_AUTO_FOCUS_STOP: u32 = V4L2_CID_CAMERA_CLASS_BASE + 29;
/// Autofocus status bitmask (read-only)
pub const V4L2_CID_AUTO_FOCUS_STATUS: u32 = V4L2_CID_CAMERA_CLASS_BASE + 30;
/// Mounting position: front, back or external (read-only)
pub const V4L2_CID_CAMERA_ORIENTATION: u32 = V4L2_CID_CAMERA_CLASS_BASE + 34;

// ===== V4L2 Control IDs (Flash Class) =====

/// Flash LED mode: none, flash or torch
pub const V4L2_CID_FLASH_LED_MODE: u32 = V4L2_CID_FLASH_CLASS_BASE + 1;

// ===== V4L2 Menu Values =====

/// Average metering across entire frame
pub const V4L2_EXPOSURE_METERING_AVERAGE: i32 = 0;
/// Spot metering on the focus region
pub const V4L2_EXPOSURE_METERING_SPOT: i32 = 2;

pub const V4L2_FLASH_LED_MODE_NONE: i32 = 0;
pub const V4L2_FLASH_LED_MODE_TORCH: i32 = 2;

pub const V4L2_CAMERA_ORIENTATION_FRONT: i32 = 0;
pub const V4L2_CAMERA_ORIENTATION_BACK: i32 = 1;
pub const V4L2_CAMERA_ORIENTATION_EXTERNAL: i32 = 2;

// ===== V4L2 Control Types =====
const V4L2_CTRL_TYPE_INTEGER: u32 = 1;
const V4L2_CTRL_TYPE_BOOLEAN: u32 = 2;
const V4L2_CTRL_TYPE_MENU: u32 = 3;
const V4L2_CTRL_TYPE_BUTTON: u32 = 4;

// ===== V4L2 Control Flags =====
const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;

// ===== V4L2 ioctl Numbers =====
// Calculated as: (dir << 30) | (size << 16) | ('V' << 8) | nr
// where dir: 2=READ, 1=WRITE, 3=READ|WRITE

/// Get control value (v4l2_control: 8 bytes)
const VIDIOC_G_CTRL: libc::c_ulong = 0xC008561B;
/// Set control value (v4l2_control: 8 bytes)
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;
/// Query control info (v4l2_queryctrl: 68 bytes)
const VIDIOC_QUERYCTRL: libc::c_ulong = 0xC0445624;

// ===== V4L2 ioctl Structures =====

#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

#[repr(C)]
struct V4l2Queryctrl {
    id: u32,
    ctrl_type: u32,
    name: [u8; 32],
    minimum: i32,
    maximum: i32,
    step: i32,
    default_value: i32,
    flags: u32,
    reserved: [u32; 2],
}

// ===== Public Types =====

/// Information about a V4L2 control
#[derive(Debug, Clone)]
pub struct ControlInfo {
    pub id: u32,
    pub name: String,
    pub ctrl_type: ControlType,
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
    pub flags: u32,
}

/// V4L2 control type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Integer,
    Boolean,
    Menu,
    Button,
    Unknown(u32),
}

impl From<u32> for ControlType {
    fn from(value: u32) -> Self {
        match value {
            V4L2_CTRL_TYPE_INTEGER => ControlType::Integer,
            V4L2_CTRL_TYPE_BOOLEAN => ControlType::Boolean,
            V4L2_CTRL_TYPE_MENU => ControlType::Menu,
            V4L2_CTRL_TYPE_BUTTON => ControlType::Button,
            other => ControlType::Unknown(other),
        }
    }
}

impl ControlInfo {
    /// Check if control is disabled
    pub fn is_disabled(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_DISABLED != 0
    }
}

/// An open control file descriptor, reused for per-frame reads.
///
/// Opening a second descriptor on a streaming device is allowed by V4L2 and
/// doesn't disturb the stream owner.
#[derive(Debug)]
pub struct ControlHandle {
    file: File,
    path: String,
}

impl ControlHandle {
    pub fn open(device_path: &str) -> std::io::Result<Self> {
        Ok(Self {
            file: File::open(device_path)?,
            path: device_path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self, control_id: u32) -> Option<ControlInfo> {
        query_control_fd(self.file.as_raw_fd(), control_id)
    }

    pub fn get(&self, control_id: u32) -> Option<i32> {
        get_control_fd(self.file.as_raw_fd(), control_id)
    }

    pub fn set(&self, control_id: u32, value: i32) -> std::io::Result<()> {
        set_control_fd(self.file.as_raw_fd(), &self.path, control_id, value)
    }

    /// Whether the control exists and is enabled
    pub fn has(&self, control_id: u32) -> bool {
        self.query(control_id)
            .map(|info| !info.is_disabled())
            .unwrap_or(false)
    }
}

// ===== Helper Functions =====

/// Extract a null-terminated string from a fixed-size byte array
fn extract_name(bytes: &[u8; 32]) -> String {
    let name_len = bytes.iter().position(|&c| c == 0).unwrap_or(32);
    String::from_utf8_lossy(&bytes[..name_len]).to_string()
}

fn query_control_fd(fd: libc::c_int, control_id: u32) -> Option<ControlInfo> {
    let mut qctrl = V4l2Queryctrl {
        id: control_id,
        ctrl_type: 0,
        name: [0; 32],
        minimum: 0,
        maximum: 0,
        step: 0,
        default_value: 0,
        flags: 0,
        reserved: [0; 2],
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCTRL, &mut qctrl as *mut V4l2Queryctrl) };

    if result < 0 {
        return None;
    }

    Some(ControlInfo {
        id: qctrl.id,
        name: extract_name(&qctrl.name),
        ctrl_type: qctrl.ctrl_type.into(),
        minimum: qctrl.minimum,
        maximum: qctrl.maximum,
        step: qctrl.step,
        default_value: qctrl.default_value,
        flags: qctrl.flags,
    })
}

fn get_control_fd(fd: libc::c_int, control_id: u32) -> Option<i32> {
    let mut ctrl = V4l2Control {
        id: control_id,
        value: 0,
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_G_CTRL, &mut ctrl as *mut V4l2Control) };

    if result < 0 {
        return None;
    }

    Some(ctrl.value)
}

fn set_control_fd(
    fd: libc::c_int,
    device_path: &str,
    control_id: u32,
    value: i32,
) -> std::io::Result<()> {
    let mut ctrl = V4l2Control {
        id: control_id,
        value,
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_S_CTRL, &mut ctrl as *mut V4l2Control) };

    if result < 0 {
        let errno = std::io::Error::last_os_error();
        warn!(
            device_path,
            control_id,
            value,
            ?errno,
            "Failed to set V4L2 control"
        );
        return Err(errno);
    }

    // Check if the driver accepted our value
    if ctrl.value != value {
        debug!(
            device_path,
            control_id,
            requested = value,
            actual = ctrl.value,
            "V4L2 control value was clamped"
        );
    }

    Ok(())
}

// ===== Public Functions =====

/// Get current value of a control
pub fn get_control(device_path: &str, control_id: u32) -> Option<i32> {
    let file = File::open(device_path).ok()?;
    let value = get_control_fd(file.as_raw_fd(), control_id);
    if value.is_none() {
        debug!(device_path, control_id, "Failed to get V4L2 control");
    }
    value
}

/// Set value of a control
pub fn set_control(device_path: &str, control_id: u32, value: i32) -> std::io::Result<()> {
    let file = File::open(device_path)?;
    set_control_fd(file.as_raw_fd(), device_path, control_id, value)
}

/// Map a zoom ratio onto a `V4L2_CID_ZOOM_ABSOLUTE` range.
///
/// UVC reports the zoom range in arbitrary units; a positive minimum is taken
/// as 1x, so `ratio = value / minimum`. With a zero minimum the range maps
/// linearly onto 1x..`max_ratio`.
pub fn zoom_value_for_ratio(info: &ControlInfo, ratio: f32, max_ratio: f32) -> i32 {
    let (min, max) = (info.minimum, info.maximum.max(info.minimum));
    let value = if min > 0 {
        (ratio * min as f32).round() as i32
    } else {
        let span = (max_ratio - 1.0).max(f32::EPSILON);
        (min as f32 + (ratio - 1.0) / span * (max - min) as f32).round() as i32
    };
    let step = info.step.max(1);
    let snapped = min + ((value - min) / step) * step;
    snapped.clamp(min, max)
}

/// Ratio range a `V4L2_CID_ZOOM_ABSOLUTE` control can reach
pub fn zoom_ratio_range(info: &ControlInfo, max_ratio: f32) -> (f32, f32) {
    if info.minimum > 0 {
        (1.0, info.maximum as f32 / info.minimum as f32)
    } else if info.maximum > info.minimum {
        (1.0, max_ratio)
    } else {
        (1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zoom_info(minimum: i32, maximum: i32, step: i32) -> ControlInfo {
        ControlInfo {
            id: V4L2_CID_ZOOM_ABSOLUTE,
            name: "Zoom, Absolute".to_string(),
            ctrl_type: ControlType::Integer,
            minimum,
            maximum,
            step,
            default_value: minimum,
            flags: 0,
        }
    }

    #[test]
    fn test_control_id_values() {
        // Verify control IDs match videodev2.h
        assert_eq!(V4L2_CID_FOCUS_ABSOLUTE, 0x009a090a);
        assert_eq!(V4L2_CID_FOCUS_AUTO, 0x009a090c);
        assert_eq!(V4L2_CID_ZOOM_ABSOLUTE, 0x009a090d);
        assert_eq!(V4L2_CID_EXPOSURE_METERING, 0x009a0919);
        assert_eq!(V4L2_CID_AUTO_FOCUS_START, 0x009a091c);
        assert_eq!(V4L2_CID_AUTO_FOCUS_STATUS, 0x009a091e);
        assert_eq!(V4L2_CID_FLASH_LED_MODE, 0x009c0901);
    }

    #[test]
    fn test_control_type_conversion() {
        assert_eq!(ControlType::from(1), ControlType::Integer);
        assert_eq!(ControlType::from(2), ControlType::Boolean);
        assert_eq!(ControlType::from(3), ControlType::Menu);
        assert_eq!(ControlType::from(4), ControlType::Button);
        assert_eq!(ControlType::from(99), ControlType::Unknown(99));
    }

    #[test]
    fn test_zoom_with_unit_minimum() {
        // Typical UVC range 100..500 means 1x..5x
        let info = zoom_info(100, 500, 1);
        assert_eq!(zoom_ratio_range(&info, 4.0), (1.0, 5.0));
        assert_eq!(zoom_value_for_ratio(&info, 1.0, 4.0), 100);
        assert_eq!(zoom_value_for_ratio(&info, 2.5, 4.0), 250);
        assert_eq!(zoom_value_for_ratio(&info, 9.0, 4.0), 500);
    }

    #[test]
    fn test_zoom_with_zero_minimum() {
        let info = zoom_info(0, 10, 2);
        assert_eq!(zoom_ratio_range(&info, 4.0), (1.0, 4.0));
        assert_eq!(zoom_value_for_ratio(&info, 1.0, 4.0), 0);
        assert_eq!(zoom_value_for_ratio(&info, 4.0, 4.0), 10);
        // 2.5x lands on 5, snapped down to the step grid
        assert_eq!(zoom_value_for_ratio(&info, 2.5, 4.0), 4);
    }
}
