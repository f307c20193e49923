// SPDX-License-Identifier: GPL-3.0-only

//! Torch control via Linux sysfs flash LEDs
//!
//! Discovers flash LEDs exposed at `/sys/class/leds/*:flash` and drives them
//! in torch mode through the `brightness` file, which is group-writable by
//! `feedbackd` on phones. The root-only `flash_strobe` interface is not used.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const LEDS_DIR: &str = "/sys/class/leds";

/// A flash LED device discovered via sysfs
#[derive(Debug, Clone)]
pub struct FlashDevice {
    /// Sysfs path, e.g. `/sys/class/leds/white:flash`
    path: PathBuf,
    /// Maximum brightness value (from `max_brightness` file)
    max_brightness: u32,
    /// Directory basename
    name: String,
}

impl FlashDevice {
    /// Scan `/sys/class/leds/` for writable `*:flash` entries
    pub fn discover() -> Vec<FlashDevice> {
        Self::discover_in(Path::new(LEDS_DIR))
    }

    /// Scan `leds_dir` for writable `*:flash` entries, sorted by name
    pub fn discover_in(leds_dir: &Path) -> Vec<FlashDevice> {
        let Ok(entries) = std::fs::read_dir(leds_dir) else {
            warn!(path = %leds_dir.display(), "Cannot read LED directory, flash discovery skipped");
            return Vec::new();
        };

        let mut devices = Vec::new();

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name_str) = name.to_str() else {
                continue;
            };

            // Match entries like "white:flash", "yellow:flash"
            if !name_str.ends_with(":flash") {
                continue;
            }

            let led_path = entry.path();
            let brightness_path = led_path.join("brightness");
            let max_brightness_path = led_path.join("max_brightness");

            let max_brightness = match std::fs::read_to_string(&max_brightness_path) {
                Ok(s) => match s.trim().parse::<u32>() {
                    Ok(v) if v > 0 => v,
                    _ => {
                        warn!(
                            path = %max_brightness_path.display(),
                            "Invalid max_brightness value"
                        );
                        continue;
                    }
                },
                Err(e) => {
                    warn!(
                        path = %max_brightness_path.display(),
                        error = %e,
                        "Cannot read max_brightness"
                    );
                    continue;
                }
            };

            if let Err(e) = std::fs::OpenOptions::new()
                .write(true)
                .open(&brightness_path)
            {
                warn!(
                    path = %brightness_path.display(),
                    error = %e,
                    "Flash LED found but not writable; user may need to be in the 'feedbackd' group"
                );
                continue;
            }

            info!(name = name_str, max_brightness, "Discovered flash LED");

            devices.push(FlashDevice {
                path: led_path,
                max_brightness,
                name: name_str.to_string(),
            });
        }

        // Deterministic ordering (white before yellow)
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set raw brightness value (0 = off, max_brightness = full)
    pub fn set_brightness(&self, value: u32) -> io::Result<()> {
        let clamped = value.min(self.max_brightness);
        std::fs::write(self.path.join("brightness"), clamped.to_string())
    }

    pub fn off(&self) -> io::Result<()> {
        self.set_brightness(0)
    }

    /// Turn on at a fraction of max brightness (0.0 = off, 1.0 = full)
    pub fn torch(&self, intensity: f32) -> io::Result<()> {
        let clamped = intensity.clamp(0.0, 1.0);
        let value = (clamped * self.max_brightness as f32).round() as u32;
        self.set_brightness(value)
    }
}

/// Turn on all devices at full brightness; fails if none could be lit
pub fn all_on(devices: &[FlashDevice]) -> io::Result<()> {
    let mut last_error = None;
    let mut lit = 0;
    for dev in devices {
        match dev.torch(1.0) {
            Ok(()) => lit += 1,
            Err(e) => {
                warn!(device = %dev.name, error = %e, "Failed to turn on flash LED");
                last_error = Some(e);
            }
        }
    }
    match (lit, last_error) {
        (0, Some(e)) => Err(e),
        _ => Ok(()),
    }
}

/// Turn off all devices
pub fn all_off(devices: &[FlashDevice]) {
    for dev in devices {
        if let Err(e) = dev.off() {
            warn!(device = %dev.name, error = %e, "Failed to turn off flash LED");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_led(root: &Path, name: &str, max: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("max_brightness"), max).unwrap();
        std::fs::write(dir.join("brightness"), "0").unwrap();
    }

    #[test]
    fn test_discover_and_drive_fake_leds() {
        let root = std::env::temp_dir().join(format!("viewfinder-leds-{}", uuid::Uuid::new_v4()));
        fake_led(&root, "yellow:flash", "255\n");
        fake_led(&root, "white:flash", "100\n");
        fake_led(&root, "green:status", "1\n");
        fake_led(&root, "broken:flash", "0\n");

        let devices = FlashDevice::discover_in(&root);
        let names: Vec<&str> = devices.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["white:flash", "yellow:flash"]);

        all_on(&devices).unwrap();
        let white = std::fs::read_to_string(root.join("white:flash/brightness")).unwrap();
        assert_eq!(white, "100");

        devices[0].torch(0.5).unwrap();
        let white = std::fs::read_to_string(root.join("white:flash/brightness")).unwrap();
        assert_eq!(white, "50");

        all_off(&devices);
        let yellow = std::fs::read_to_string(root.join("yellow:flash/brightness")).unwrap();
        assert_eq!(yellow, "0");

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_leds_dir() {
        let root = std::env::temp_dir().join("viewfinder-no-leds-c41d");
        assert!(FlashDevice::discover_in(&root).is_empty());
    }
}
