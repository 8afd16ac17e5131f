//! Driver calibration lookup.
//!
//! A [`CalibrationStore`] answers "what does the driver know about axis slot N
//! of device VID:PID". Records may remap the usage that feeds a slot and may
//! carry a `min/center/max` calibration. [`resolve_calibration`] applies them
//! to a [`DescriptorSet`] once at attach time.
//!
//! Slots follow the DirectInput object order `X, Y, Z, Rx, Ry, Rz, Slider`.
//! When a device declares a slider but no Z usage, the slider feeds Z and the
//! slider slot is left empty.
//!
//! Stores are read-only from this crate's point of view. Absence of data is
//! never an error: descriptors keep their logical range.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::caps::DescriptorSet;
use crate::device::DeviceClass;
use crate::error::ConfigError;
use crate::usage::{page, usage_name, AxisSlot};

/// Number of slots covered by driver calibration data.
pub const CALIBRATED_SLOTS: usize = 7;

const Z_SLOT: usize = 2;
const SLIDER_SLOT: usize = 6;

/// Usage override stored by the driver for one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMapping {
    pub usage_page: u16,
    pub usage: u16,
}

/// Driver data for one axis slot of one device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub axis_index: usize,
    pub min: i32,
    pub center: i32,
    pub max: i32,
    /// `min/center/max` are only meaningful when set.
    pub present: bool,
    pub mapping: Option<UsageMapping>,
    pub name: Option<String>,
}

impl CalibrationRecord {
    pub fn calibrated(axis_index: usize, min: i32, center: i32, max: i32) -> Self {
        Self {
            axis_index,
            min,
            center,
            max,
            present: true,
            mapping: None,
            name: None,
        }
    }

    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.min <= self.center && self.center <= self.max
    }
}

/// Read-only per-device calibration source.
pub trait CalibrationStore {
    fn lookup(&self, vendor_id: u16, product_id: u16, axis_slot: usize)
        -> Option<CalibrationRecord>;

    /// Diagnostic axis name.
    fn lookup_axis_name(&self, vendor_id: u16, product_id: u16, axis_slot: usize) -> Option<String> {
        self.lookup(vendor_id, product_id, axis_slot)
            .and_then(|r| r.name)
    }

    /// Diagnostic button name.
    fn lookup_button_name(&self, _vendor_id: u16, _product_id: u16, _button: usize) -> Option<String> {
        None
    }
}

/// A store with no data.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCalibration;

impl CalibrationStore for NoCalibration {
    fn lookup(&self, _: u16, _: u16, _: usize) -> Option<CalibrationRecord> {
        None
    }
}

/// In-memory store, optionally loaded from TOML.
///
/// ```toml
/// [[axis]]
/// vendor_id = 0x046d
/// product_id = 0xc626
/// slot = 0
/// min = -500
/// center = 0
/// max = 500
///
/// [[axis]]
/// vendor_id = 0x046d
/// product_id = 0xc626
/// slot = 2
/// usage_page = 0x01
/// usage = 0x36
/// name = "Throttle"
///
/// [[button]]
/// vendor_id = 0x046d
/// product_id = 0xc626
/// index = 0
/// name = "Left"
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryCalibrationStore {
    axes: HashMap<(u16, u16, usize), CalibrationRecord>,
    buttons: HashMap<(u16, u16, usize), String>,
}

#[derive(Debug, Deserialize)]
struct StoreFile {
    #[serde(default)]
    axis: Vec<AxisEntry>,
    #[serde(default)]
    button: Vec<ButtonEntry>,
}

#[derive(Debug, Deserialize)]
struct AxisEntry {
    vendor_id: u16,
    product_id: u16,
    slot: usize,
    min: Option<i32>,
    center: Option<i32>,
    max: Option<i32>,
    usage_page: Option<u16>,
    usage: Option<u16>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ButtonEntry {
    vendor_id: u16,
    product_id: u16,
    index: usize,
    name: String,
}

impl MemoryCalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, vendor_id: u16, product_id: u16, record: CalibrationRecord) {
        self.axes
            .insert((vendor_id, product_id, record.axis_index), record);
    }

    pub fn insert_button_name(
        &mut self,
        vendor_id: u16,
        product_id: u16,
        button: usize,
        name: impl Into<String>,
    ) {
        self.buttons
            .insert((vendor_id, product_id, button), name.into());
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: StoreFile = toml::from_str(text)?;
        let mut store = Self::new();
        for entry in file.axis {
            if entry.slot >= CALIBRATED_SLOTS {
                return Err(ConfigError::Invalid {
                    field: "axis.slot".into(),
                    reason: format!("{} is not below {CALIBRATED_SLOTS}", entry.slot),
                });
            }
            let mapping = match (entry.usage_page, entry.usage) {
                (Some(usage_page), Some(usage)) => Some(UsageMapping { usage_page, usage }),
                (None, None) => None,
                _ => {
                    return Err(ConfigError::Invalid {
                        field: "axis.usage".into(),
                        reason: "usage_page and usage must be given together".into(),
                    })
                }
            };
            let record = match (entry.min, entry.center, entry.max) {
                (Some(min), Some(center), Some(max)) => CalibrationRecord {
                    mapping,
                    name: entry.name,
                    ..CalibrationRecord::calibrated(entry.slot, min, center, max)
                },
                _ => CalibrationRecord {
                    axis_index: entry.slot,
                    mapping,
                    name: entry.name,
                    ..CalibrationRecord::default()
                },
            };
            store.insert(entry.vendor_id, entry.product_id, record);
        }
        for entry in file.button {
            store.insert_button_name(entry.vendor_id, entry.product_id, entry.index, entry.name);
        }
        Ok(store)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn lookup(&self, vendor_id: u16, product_id: u16, axis_slot: usize) -> Option<CalibrationRecord> {
        self.axes.get(&(vendor_id, product_id, axis_slot)).cloned()
    }

    fn lookup_button_name(&self, vendor_id: u16, product_id: u16, button: usize) -> Option<String> {
        self.buttons.get(&(vendor_id, product_id, button)).cloned()
    }
}

impl<S: CalibrationStore + ?Sized> CalibrationStore for &S {
    fn lookup(&self, vendor_id: u16, product_id: u16, axis_slot: usize) -> Option<CalibrationRecord> {
        (**self).lookup(vendor_id, product_id, axis_slot)
    }

    fn lookup_axis_name(&self, vendor_id: u16, product_id: u16, axis_slot: usize) -> Option<String> {
        (**self).lookup_axis_name(vendor_id, product_id, axis_slot)
    }

    fn lookup_button_name(&self, vendor_id: u16, product_id: u16, button: usize) -> Option<String> {
        (**self).lookup_button_name(vendor_id, product_id, button)
    }
}

#[derive(Clone, Debug, Default)]
struct SlotEntry {
    mapping: Option<UsageMapping>,
    calibration: Option<(i32, i32, i32)>,
    name: Option<String>,
}

/// Build the slot table: declared usages first, then the Z/slider rule, then store overrides.
fn slot_table(
    vendor_id: u16,
    product_id: u16,
    set: &DescriptorSet,
    store: &dyn CalibrationStore,
) -> [SlotEntry; CALIBRATED_SLOTS] {
    let mut table: [SlotEntry; CALIBRATED_SLOTS] = Default::default();

    for axis in &set.axes {
        let Some(slot) = AxisSlot::from_usage(axis.usage_page, axis.usage) else {
            continue;
        };
        if let Some(entry) = table.get_mut(slot.index()) {
            entry.mapping.get_or_insert(UsageMapping {
                usage_page: axis.usage_page,
                usage: axis.usage,
            });
        }
    }

    if table[Z_SLOT].mapping.is_none() {
        table[Z_SLOT].mapping = table[SLIDER_SLOT].mapping.take();
    }

    for (slot, entry) in table.iter_mut().enumerate() {
        let Some(record) = store.lookup(vendor_id, product_id, slot) else {
            continue;
        };
        if let Some(m) = record.mapping {
            if m.usage_page < page::CALIBRATION_LIMIT {
                entry.mapping = (m.usage_page != 0).then_some(m);
            }
        }
        if record.present {
            if record.is_ordered() {
                entry.calibration = Some((record.min, record.center, record.max));
            } else {
                warn!(
                    vid = vendor_id,
                    pid = product_id,
                    slot,
                    min = record.min,
                    center = record.center,
                    max = record.max,
                    "ignoring unordered calibration record"
                );
            }
        }
        entry.name = record.name;
    }
    table
}

/// Apply driver calibration and slot mapping to `set`.
///
/// Re-running with the same store contents yields identical descriptors.
pub fn resolve_calibration(
    vendor_id: u16,
    product_id: u16,
    class: DeviceClass,
    set: &mut DescriptorSet,
    store: &dyn CalibrationStore,
) {
    let mut table = slot_table(vendor_id, product_id, set, store);
    let slot_limit = class.axis_count().min(CALIBRATED_SLOTS);

    for axis in set.axes.iter_mut() {
        axis.reset_calibration();
        axis.name = usage_name(axis.usage_page, axis.usage);
        if axis.slot.is_some_and(|s| s.index() < CALIBRATED_SLOTS) {
            axis.slot = None;
        }
        if axis.is_hat() {
            continue;
        }

        let found = table.iter_mut().take(slot_limit).enumerate().find(|(_, e)| {
            e.mapping
                .is_some_and(|m| m.usage_page == axis.usage_page && m.usage == axis.usage)
        });
        let Some((slot, entry)) = found else {
            continue;
        };
        // Each mapping feeds one descriptor.
        entry.mapping = None;
        axis.slot = AxisSlot::from_index(slot);
        if let Some((min, center, max)) = entry.calibration {
            axis.calibrated_min = min;
            axis.calibrated_center = center;
            axis.calibrated_max = max;
            axis.is_calibrated = true;
        }
        if let Some(name) = entry.name.clone() {
            axis.name = name;
        }
    }

    for button in set.buttons.iter_mut() {
        if let Some(name) = store.lookup_button_name(vendor_id, product_id, button.index) {
            button.name = name;
        }
    }

    debug!(
        vid = vendor_id,
        pid = product_id,
        calibrated = set.axes.iter().filter(|a| a.is_calibrated).count(),
        mapped = set.mapped_axes().count(),
        "calibration resolved"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::{resolve, CapabilitySet, UsageSpec, ValueCap};
    use crate::usage::generic;

    const VID: u16 = 0x046d;
    const PID: u16 = 0xc215;

    fn single(usage: u16, data_index: u16) -> ValueCap {
        ValueCap {
            report_id: 0,
            usage_page: page::GENERIC_DESKTOP,
            link_collection: 0,
            usages: UsageSpec::Single { usage, data_index },
            logical_min: 0,
            logical_max: 1023,
            physical_min: 0,
            physical_max: 1023,
            bit_size: 10,
        }
    }

    fn descriptors(usages: &[u16], class: DeviceClass) -> DescriptorSet {
        let caps = CapabilitySet {
            buttons: vec![],
            values: usages
                .iter()
                .enumerate()
                .map(|(i, u)| single(*u, i as u16))
                .collect(),
        };
        resolve(&caps, class)
    }

    #[test]
    fn absent_store_keeps_logical_range() {
        let mut set = descriptors(&[generic::X, generic::Y], DeviceClass::Joystick);
        resolve_calibration(VID, PID, DeviceClass::Joystick, &mut set, &NoCalibration);
        let x = set.axis(AxisSlot::X).unwrap();
        assert_eq!((x.calibrated_min, x.calibrated_center, x.calibrated_max), (0, 511, 1023));
        assert!(!x.is_calibrated);
        assert_eq!(set.axis(AxisSlot::Y).unwrap().usage, generic::Y);
    }

    #[test]
    fn store_overrides_bounds() {
        let mut store = MemoryCalibrationStore::new();
        store.insert(VID, PID, CalibrationRecord::calibrated(1, 40, 500, 990));
        let mut set = descriptors(&[generic::X, generic::Y], DeviceClass::Joystick);
        resolve_calibration(VID, PID, DeviceClass::Joystick, &mut set, &store);
        let y = set.axis(AxisSlot::Y).unwrap();
        assert!(y.is_calibrated);
        assert_eq!((y.calibrated_min, y.calibrated_center, y.calibrated_max), (40, 500, 990));
        assert!(!set.axis(AxisSlot::X).unwrap().is_calibrated);
    }

    #[test]
    fn unordered_record_is_ignored() {
        let mut store = MemoryCalibrationStore::new();
        store.insert(VID, PID, CalibrationRecord::calibrated(0, 500, 10, 900));
        let mut set = descriptors(&[generic::X], DeviceClass::Joystick);
        resolve_calibration(VID, PID, DeviceClass::Joystick, &mut set, &store);
        let x = set.axis(AxisSlot::X).unwrap();
        assert!(!x.is_calibrated);
        assert!(x.calibrated_min <= x.calibrated_center && x.calibrated_center <= x.calibrated_max);
    }

    #[test]
    fn slider_moves_into_missing_z() {
        let mut set = descriptors(&[generic::X, generic::Y, generic::SLIDER], DeviceClass::Joystick);
        let slider_before = set.axes[2].clone();
        resolve_calibration(VID, PID, DeviceClass::Joystick, &mut set, &NoCalibration);

        let z = set.axis(AxisSlot::Z).unwrap();
        assert_eq!(z.usage, generic::SLIDER);
        assert_eq!(z.calibrated_min, slider_before.calibrated_min);
        assert_eq!(z.calibrated_center, slider_before.calibrated_center);
        assert_eq!(z.calibrated_max, slider_before.calibrated_max);
        assert!(set.axis(AxisSlot::Slider).is_none());
    }

    #[test]
    fn declared_z_keeps_slider() {
        let mut set = descriptors(&[generic::Z, generic::SLIDER], DeviceClass::Joystick);
        resolve_calibration(VID, PID, DeviceClass::Joystick, &mut set, &NoCalibration);
        assert_eq!(set.axis(AxisSlot::Z).unwrap().usage, generic::Z);
        assert_eq!(set.axis(AxisSlot::Slider).unwrap().usage, generic::SLIDER);
    }

    #[test]
    fn mapping_override_respects_reserved_pages() {
        let mut store = MemoryCalibrationStore::new();
        store.insert(
            VID,
            PID,
            CalibrationRecord {
                axis_index: 0,
                mapping: Some(UsageMapping { usage_page: 0x01, usage: generic::RZ }),
                name: Some("Twist".into()),
                ..Default::default()
            },
        );
        store.insert(
            VID,
            PID,
            CalibrationRecord {
                axis_index: 1,
                mapping: Some(UsageMapping { usage_page: 0x20, usage: generic::X }),
                ..Default::default()
            },
        );
        let mut set = descriptors(&[generic::Y, generic::RZ], DeviceClass::Joystick);
        resolve_calibration(VID, PID, DeviceClass::Joystick, &mut set, &store);

        let x = set.axis(AxisSlot::X).unwrap();
        assert_eq!(x.usage, generic::RZ);
        assert_eq!(x.name, "Twist");
        // Page 0x20 is past the limit; slot 1 keeps the declared Y.
        assert_eq!(set.axis(AxisSlot::Y).unwrap().usage, generic::Y);
        assert!(set.axis(AxisSlot::Rz).is_none());
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut store = MemoryCalibrationStore::new();
        store.insert(VID, PID, CalibrationRecord::calibrated(2, 0, 300, 1023));
        let mut set = descriptors(&[generic::X, generic::SLIDER, generic::DIAL], DeviceClass::Joystick);
        resolve_calibration(VID, PID, DeviceClass::Joystick, &mut set, &store);
        let once = set.clone();
        resolve_calibration(VID, PID, DeviceClass::Joystick, &mut set, &store);
        assert_eq!(once, set);
        assert_eq!(set.axis(AxisSlot::Dial).unwrap().usage, generic::DIAL);
        assert!(set.axis(AxisSlot::Z).unwrap().is_calibrated);
    }

    #[test]
    fn toml_store() {
        let store = MemoryCalibrationStore::from_toml_str(
            r#"
            [[axis]]
            vendor_id = 0x046d
            product_id = 0xc626
            slot = 0
            min = -500
            center = 0
            max = 500

            [[axis]]
            vendor_id = 0x046d
            product_id = 0xc626
            slot = 2
            usage_page = 0x01
            usage = 0x36
            name = "Throttle"

            [[button]]
            vendor_id = 0x046d
            product_id = 0xc626
            index = 1
            name = "Right"
            "#,
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        let x = store.lookup(0x046d, 0xc626, 0).unwrap();
        assert!(x.present);
        assert_eq!((x.min, x.center, x.max), (-500, 0, 500));
        let z = store.lookup(0x046d, 0xc626, 2).unwrap();
        assert!(!z.present);
        assert_eq!(z.mapping, Some(UsageMapping { usage_page: 1, usage: 0x36 }));
        assert_eq!(store.lookup_axis_name(0x046d, 0xc626, 2).as_deref(), Some("Throttle"));
        assert_eq!(store.lookup_button_name(0x046d, 0xc626, 1).as_deref(), Some("Right"));
        assert!(store.lookup(0x046d, 0xc627, 0).is_none());
    }

    #[test]
    fn toml_store_rejects_bad_slot() {
        let err = MemoryCalibrationStore::from_toml_str(
            "[[axis]]\nvendor_id = 1\nproduct_id = 2\nslot = 7\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
