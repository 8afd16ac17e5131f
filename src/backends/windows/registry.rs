#![cfg(target_os = "windows")]
//! DirectInput calibration data from the current user's registry hive.
//!
//! Two trees are read, both under
//! `HKCU\System\CurrentControlSet\Control\MediaProperties\PrivateProperties`:
//!
//! - `Joystick\OEM\VID_xxxx&PID_xxxx\Axes\N`: default value = axis name,
//!   `Attributes` = 8-byte `DIOBJECTATTRIBUTES` (flags, usage page, usage).
//! - `Joystick\OEM\VID_xxxx&PID_xxxx\Buttons\N`: default value = button name.
//! - `DirectInput\VID_xxxx&PID_xxxx\Calibration\0\Type\Axes\N`: `Calibration` =
//!   12 bytes of `i32` min, center, max.
//!
//! Missing keys or values of the wrong type or size mean "no data".

use winreg::enums::{RegType, HKEY_CURRENT_USER, KEY_READ};
use winreg::RegKey;

use crate::calibration::{CalibrationRecord, CalibrationStore, UsageMapping};

const PRIVATE_PROPERTIES: &str =
    r"System\CurrentControlSet\Control\MediaProperties\PrivateProperties";

const ATTRIBUTES_LEN: usize = 8;
const CALIBRATION_LEN: usize = 12;

#[derive(Clone, Copy, Debug, Default)]
pub struct RegistryCalibrationStore;

impl RegistryCalibrationStore {
    pub fn new() -> Self {
        Self
    }

    fn open(path: &str) -> Option<RegKey> {
        RegKey::predef(HKEY_CURRENT_USER)
            .open_subkey_with_flags(path, KEY_READ)
            .ok()
    }

    fn binary(key: &RegKey, name: &str, len: usize) -> Option<Vec<u8>> {
        let value = key.get_raw_value(name).ok()?;
        (value.vtype == RegType::REG_BINARY && value.bytes.len() == len).then_some(value.bytes)
    }

    fn name(key: &RegKey) -> Option<String> {
        key.get_value::<String, _>("")
            .ok()
            .map(|s| s.trim_end_matches('\0').to_owned())
            .filter(|s| !s.is_empty())
    }
}

fn oem_path(vendor_id: u16, product_id: u16, kind: &str, index: usize) -> String {
    format!(r"{PRIVATE_PROPERTIES}\Joystick\OEM\VID_{vendor_id:04X}&PID_{product_id:04X}\{kind}\{index}")
}

fn calibration_path(vendor_id: u16, product_id: u16, index: usize) -> String {
    format!(
        r"{PRIVATE_PROPERTIES}\DirectInput\VID_{vendor_id:04X}&PID_{product_id:04X}\Calibration\0\Type\Axes\{index}"
    )
}

/// `DIOBJECTATTRIBUTES`: `u32` flags, `u16` usage page, `u16` usage.
fn parse_attributes(bytes: &[u8]) -> Option<UsageMapping> {
    let b: &[u8; ATTRIBUTES_LEN] = bytes.try_into().ok()?;
    Some(UsageMapping {
        usage_page: u16::from_le_bytes([b[4], b[5]]),
        usage: u16::from_le_bytes([b[6], b[7]]),
    })
}

fn parse_calibration(bytes: &[u8]) -> Option<(i32, i32, i32)> {
    let b: &[u8; CALIBRATION_LEN] = bytes.try_into().ok()?;
    let read = |i: usize| i32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]]);
    Some((read(0), read(4), read(8)))
}

impl CalibrationStore for RegistryCalibrationStore {
    fn lookup(&self, vendor_id: u16, product_id: u16, axis_slot: usize) -> Option<CalibrationRecord> {
        let oem = Self::open(&oem_path(vendor_id, product_id, "Axes", axis_slot));
        let cal = Self::open(&calibration_path(vendor_id, product_id, axis_slot));
        if oem.is_none() && cal.is_none() {
            return None;
        }

        let mut record = CalibrationRecord { axis_index: axis_slot, ..Default::default() };
        if let Some(key) = &oem {
            record.name = Self::name(key);
            record.mapping = Self::binary(key, "Attributes", ATTRIBUTES_LEN)
                .as_deref()
                .and_then(parse_attributes);
        }
        if let Some((min, center, max)) = cal
            .as_ref()
            .and_then(|key| Self::binary(key, "Calibration", CALIBRATION_LEN))
            .as_deref()
            .and_then(parse_calibration)
        {
            record.min = min;
            record.center = center;
            record.max = max;
            record.present = true;
        }
        tracing::trace!(vid = vendor_id, pid = product_id, slot = axis_slot, ?record, "registry calibration");
        Some(record)
    }

    fn lookup_button_name(&self, vendor_id: u16, product_id: u16, button: usize) -> Option<String> {
        Self::open(&oem_path(vendor_id, product_id, "Buttons", button)).and_then(|k| Self::name(&k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_paths() {
        assert!(oem_path(0x046d, 0xc215, "Axes", 2).ends_with(r"Joystick\OEM\VID_046D&PID_C215\Axes\2"));
        assert!(calibration_path(0x046d, 0xc215, 6)
            .ends_with(r"DirectInput\VID_046D&PID_C215\Calibration\0\Type\Axes\6"));
    }

    #[test]
    fn binary_layouts() {
        let attrs = [0x01, 0, 0, 0, 0x01, 0x00, 0x36, 0x00];
        assert_eq!(parse_attributes(&attrs), Some(UsageMapping { usage_page: 1, usage: 0x36 }));
        assert_eq!(parse_attributes(&attrs[..7]), None);

        let mut cal = Vec::new();
        for v in [-500i32, 3, 500] {
            cal.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(parse_calibration(&cal), Some((-500, 3, 500)));
        assert_eq!(parse_calibration(&cal[..8]), None);
    }
}
