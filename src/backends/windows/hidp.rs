#![cfg(target_os = "windows")]
//! Windows HID parser (HIDP) capability queries and field extraction.
//!
//! [`HidpDevice`] opens an OS handle for a HID interface path and keeps it
//! alive alongside the preparsed data. It answers two questions:
//! - which input capabilities the device declares ([`HidpDevice::capabilities`])
//! - what a given usage holds in a raw report (its [`ReportFields`] impl)
//!
//! ## Notes
//! - Only input reports are considered.
//! - Devices without numbered reports get a `0` id byte prepended before
//!   every HIDP call, since `hidapi` strips it on Windows.
//! - Values whose logical minimum is negative are sign-extended by bit size.

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;

use windows_sys::Win32::Devices::HumanInterfaceDevice::*;
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, GENERIC_READ, GENERIC_WRITE, HANDLE, INVALID_HANDLE_VALUE, NTSTATUS,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};

use crate::caps::{AxisDescriptor, ButtonCap, ButtonGroup, CapabilitySet, UsageSpec, ValueCap};
use crate::error::{ReportError, TransportError};
use crate::fields::ReportFields;

const STATUS_SUCCESS: NTSTATUS = HIDP_STATUS_SUCCESS;
const STATUS_BUFFER_TOO_SMALL: NTSTATUS = HIDP_STATUS_BUFFER_TOO_SMALL;

/// Upper bound on usages returned for one button group.
const MAX_USAGES: usize = 128;

pub struct HidpDevice {
    handle: HANDLE,
    ppd: PHIDP_PREPARSED_DATA,
    input_report_len: usize,
    buttons: Vec<HIDP_BUTTON_CAPS>,
    values: Vec<HIDP_VALUE_CAPS>,
    numbered_reports: bool,
}

impl Drop for HidpDevice {
    fn drop(&mut self) {
        unsafe {
            if self.ppd != 0 {
                HidD_FreePreparsedData(self.ppd);
                self.ppd = 0;
            }
            if !self.handle.is_null() {
                CloseHandle(self.handle);
                self.handle = std::ptr::null_mut();
            }
        }
    }
}

// The handles are only used through `&self` calls that HIDP documents as
// read-only on the preparsed data.
unsafe impl Send for HidpDevice {}

impl std::fmt::Debug for HidpDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidpDevice")
            .field("input_report_len", &self.input_report_len)
            .field("buttons", &self.buttons.len())
            .field("values", &self.values.len())
            .field("numbered_reports", &self.numbered_reports)
            .finish()
    }
}

impl HidpDevice {
    /// Open `path` and read its preparsed data and input caps.
    pub fn open(path: &str) -> Result<Self, TransportError> {
        let handle = open_device_handle(path)
            .map_err(|code| TransportError::Io(format!("CreateFileW failed ({code}) for {path}")))?;

        let mut ppd: PHIDP_PREPARSED_DATA = 0;
        let ok = unsafe { HidD_GetPreparsedData(handle, &mut ppd) };
        if ok == 0 || ppd == 0 {
            unsafe { CloseHandle(handle) };
            return Err(TransportError::Capabilities("HidD_GetPreparsedData failed".into()));
        }

        // From here on Drop releases both handles.
        let mut dev = HidpDevice {
            handle,
            ppd,
            input_report_len: 0,
            buttons: Vec::new(),
            values: Vec::new(),
            numbered_reports: false,
        };

        let mut caps: HIDP_CAPS = unsafe { core::mem::zeroed() };
        let status = unsafe { HidP_GetCaps(ppd, &mut caps) };
        if status != STATUS_SUCCESS {
            return Err(TransportError::Capabilities(format!(
                "HidP_GetCaps status {:#010x}",
                status as u32
            )));
        }
        dev.input_report_len = usize::from(caps.InputReportByteLength);

        // A device may legally expose only buttons or only values.
        dev.buttons = enumerate_button_caps(ppd, HidP_Input).unwrap_or_default();
        dev.values = enumerate_value_caps(ppd, HidP_Input).unwrap_or_default();
        dev.numbered_reports = dev.buttons.iter().any(|c| c.ReportID != 0)
            || dev.values.iter().any(|c| c.ReportID != 0);

        tracing::debug!(
            path,
            buttons = dev.buttons.len(),
            values = dev.values.len(),
            input_report_len = dev.input_report_len,
            numbered_reports = dev.numbered_reports,
            "hidp caps read"
        );
        Ok(dev)
    }

    /// Declared input capabilities, entries with usage page 0 skipped.
    pub fn capabilities(&self) -> CapabilitySet {
        let mut set = CapabilitySet::default();
        for c in &self.buttons {
            if c.UsagePage == 0 {
                continue;
            }
            let usages = unsafe {
                if c.IsRange != 0 {
                    let r = c.Anonymous.Range;
                    UsageSpec::Range {
                        usage_min: r.UsageMin,
                        usage_max: r.UsageMax,
                        data_index_min: r.DataIndexMin,
                        data_index_max: r.DataIndexMax,
                    }
                } else {
                    let nr = c.Anonymous.NotRange;
                    UsageSpec::Single { usage: nr.Usage, data_index: nr.DataIndex }
                }
            };
            set.buttons.push(ButtonCap {
                report_id: c.ReportID,
                usage_page: c.UsagePage,
                link_collection: c.LinkCollection,
                usages,
            });
        }
        for c in &self.values {
            if c.UsagePage == 0 {
                continue;
            }
            let usages = unsafe {
                if c.IsRange != 0 {
                    let r = c.Anonymous.Range;
                    UsageSpec::Range {
                        usage_min: r.UsageMin,
                        usage_max: r.UsageMax,
                        data_index_min: r.DataIndexMin,
                        data_index_max: r.DataIndexMax,
                    }
                } else {
                    let nr = c.Anonymous.NotRange;
                    UsageSpec::Single { usage: nr.Usage, data_index: nr.DataIndex }
                }
            };
            set.values.push(ValueCap {
                report_id: c.ReportID,
                usage_page: c.UsagePage,
                link_collection: c.LinkCollection,
                usages,
                logical_min: c.LogicalMin,
                logical_max: c.LogicalMax,
                physical_min: c.PhysicalMin,
                physical_max: c.PhysicalMax,
                bit_size: c.BitSize,
            });
        }
        set
    }

    /// Copy `report` into a HIDP-sized buffer, restoring the id byte if needed.
    fn report_buffer(&self, report: &[u8]) -> Result<Vec<u8>, ReportError> {
        if report.is_empty() {
            return Err(ReportError::Empty);
        }
        let mut buf = Vec::with_capacity(self.input_report_len.max(report.len() + 1));
        if !self.numbered_reports {
            buf.push(0);
        }
        buf.extend_from_slice(report);
        if self.input_report_len > 0 {
            buf.resize(self.input_report_len, 0);
        }
        Ok(buf)
    }

    fn check_report_id(&self, buf: &[u8], expected: u8) -> Result<(), ReportError> {
        let actual = buf.first().copied();
        if self.numbered_reports && expected != 0 && actual != Some(expected) {
            return Err(ReportError::ReportIdMismatch { expected, actual });
        }
        Ok(())
    }
}

impl ReportFields for HidpDevice {
    fn value(&self, report: &[u8], axis: &AxisDescriptor) -> Result<i32, ReportError> {
        let mut buf = self.report_buffer(report)?;
        self.check_report_id(&buf, axis.report_id)?;
        let len = buf.len() as u32;
        let mut raw: u32 = 0;
        let mut status = unsafe {
            HidP_GetUsageValue(
                HidP_Input,
                axis.usage_page,
                axis.link_collection,
                axis.usage,
                &mut raw,
                self.ppd,
                buf.as_mut_ptr(),
                len,
            )
        };
        // Some stacks only resolve values in the top-level collection.
        if status != STATUS_SUCCESS && axis.link_collection != 0 {
            status = unsafe {
                HidP_GetUsageValue(
                    HidP_Input,
                    axis.usage_page,
                    0,
                    axis.usage,
                    &mut raw,
                    self.ppd,
                    buf.as_mut_ptr(),
                    len,
                )
            };
        }
        if status != STATUS_SUCCESS {
            return Err(ReportError::Status(status));
        }
        Ok(extend_sign(raw, axis.bit_size, axis.logical_min < 0))
    }

    fn pressed_usages(&self, report: &[u8], group: &ButtonGroup) -> Result<Vec<u16>, ReportError> {
        let mut buf = self.report_buffer(report)?;
        self.check_report_id(&buf, group.report_id)?;
        let len = buf.len() as u32;
        let mut usages = [0u16; MAX_USAGES];
        let mut count = usages.len() as u32;
        let status = unsafe {
            HidP_GetUsages(
                HidP_Input,
                group.usage_page,
                group.link_collection,
                usages.as_mut_ptr(),
                &mut count,
                self.ppd,
                buf.as_mut_ptr(),
                len,
            )
        };
        if status != STATUS_SUCCESS {
            return Err(ReportError::Status(status));
        }
        let count = (count as usize).min(usages.len());
        Ok(usages[..count]
            .iter()
            .copied()
            .filter(|u| group.range.contains(*u))
            .collect())
    }
}

/// Interpret the low `bit_size` bits of `raw` as two's complement when `signed`.
fn extend_sign(raw: u32, bit_size: u16, signed: bool) -> i32 {
    if !signed || bit_size == 0 || bit_size >= 32 {
        return raw as i32;
    }
    let shift = 32 - u32::from(bit_size);
    ((raw << shift) as i32) >> shift
}

fn enumerate_button_caps(
    ppd: PHIDP_PREPARSED_DATA,
    report_type: HIDP_REPORT_TYPE,
) -> Option<Vec<HIDP_BUTTON_CAPS>> {
    let mut len: u16 = 64;
    for _ in 0..2 {
        let mut caps: Vec<HIDP_BUTTON_CAPS> = vec![unsafe { core::mem::zeroed() }; usize::from(len)];
        let mut needed = len;
        let status = unsafe { HidP_GetButtonCaps(report_type, caps.as_mut_ptr(), &mut needed, ppd) };
        if status == STATUS_SUCCESS {
            caps.truncate(usize::from(needed));
            return Some(caps);
        }
        if status != STATUS_BUFFER_TOO_SMALL || needed == 0 {
            break;
        }
        len = needed;
    }
    None
}

fn enumerate_value_caps(
    ppd: PHIDP_PREPARSED_DATA,
    report_type: HIDP_REPORT_TYPE,
) -> Option<Vec<HIDP_VALUE_CAPS>> {
    let mut len: u16 = 64;
    for _ in 0..2 {
        let mut caps: Vec<HIDP_VALUE_CAPS> = vec![unsafe { core::mem::zeroed() }; usize::from(len)];
        let mut needed = len;
        let status = unsafe { HidP_GetValueCaps(report_type, caps.as_mut_ptr(), &mut needed, ppd) };
        if status == STATUS_SUCCESS {
            caps.truncate(usize::from(needed));
            return Some(caps);
        }
        if status != STATUS_BUFFER_TOO_SMALL || needed == 0 {
            break;
        }
        len = needed;
    }
    None
}

/// Open a file handle for a HID interface path, read-write if allowed.
///
/// Returns `GetLastError()` on failure. The handle must be closed with `CloseHandle`.
fn open_device_handle(path: &str) -> Result<HANDLE, u32> {
    use std::ptr::{null, null_mut};

    let wide: Vec<u16> = OsStr::new(path)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    let try_open = |access: u32| unsafe {
        CreateFileW(
            wide.as_ptr(),
            access,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            null(),
            OPEN_EXISTING,
            FILE_ATTRIBUTE_NORMAL,
            null_mut(),
        )
    };

    let mut handle = try_open(GENERIC_READ | GENERIC_WRITE);
    if handle == INVALID_HANDLE_VALUE {
        handle = try_open(GENERIC_READ);
    }
    if handle == INVALID_HANDLE_VALUE {
        Err(unsafe { GetLastError() })
    } else {
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::extend_sign;

    #[test]
    fn sign_extension_by_bit_size() {
        assert_eq!(extend_sign(0x0fff, 12, true), -1);
        assert_eq!(extend_sign(0x07ff, 12, true), 2047);
        assert_eq!(extend_sign(0x0fff, 12, false), 4095);
        assert_eq!(extend_sign(0xffff_fea2, 32, true), -350);
    }
}
