//! Capability entries and their resolution into descriptors.
//!
//! A transport reports the device's input capabilities as a [`CapabilitySet`]:
//! button entries and value entries, each covering either a single usage or a
//! contiguous usage range. [`resolve`] canonicalizes every entry to a range,
//! expands ranges into one descriptor per usage, orders the result by report
//! data index and assigns the initial [`AxisSlot`]s for the device class.
//!
//! Calibrated bounds start out equal to the logical bounds with the center at
//! the midpoint; [`crate::calibration::resolve_calibration`] refines them.

use serde::{Deserialize, Serialize};

use crate::device::DeviceClass;
use crate::usage::{is_hat_switch, usage_name, AxisSlot};

/// Usage coverage of one capability entry as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageSpec {
    Single { usage: u16, data_index: u16 },
    Range {
        usage_min: u16,
        usage_max: u16,
        data_index_min: u16,
        data_index_max: u16,
    },
}

impl UsageSpec {
    /// Both shapes as a range; a single usage becomes a range of length one.
    pub fn canonical(&self) -> UsageRange {
        match *self {
            UsageSpec::Single { usage, data_index } => UsageRange {
                usage_min: usage,
                usage_max: usage,
                data_index_min: data_index,
                data_index_max: data_index,
            },
            UsageSpec::Range {
                usage_min,
                usage_max,
                data_index_min,
                data_index_max,
            } => UsageRange {
                usage_min: usage_min.min(usage_max),
                usage_max: usage_max.max(usage_min),
                data_index_min,
                data_index_max,
            },
        }
    }
}

/// Canonical usage range (`usage_min <= usage_max`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRange {
    pub usage_min: u16,
    pub usage_max: u16,
    pub data_index_min: u16,
    pub data_index_max: u16,
}

impl UsageRange {
    #[inline]
    pub fn len(&self) -> usize {
        usize::from(self.usage_max - self.usage_min) + 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn contains(&self, usage: u16) -> bool {
        (self.usage_min..=self.usage_max).contains(&usage)
    }

    /// `(usage, data_index)` pairs, one per usage in the range.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        (self.usage_min..=self.usage_max).map(move |u| {
            let offset = u - self.usage_min;
            (u, self.data_index_min.saturating_add(offset))
        })
    }
}

/// Button capability entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonCap {
    pub report_id: u8,
    pub usage_page: u16,
    pub link_collection: u16,
    pub usages: UsageSpec,
}

/// Value (axis/hat) capability entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCap {
    pub report_id: u8,
    pub usage_page: u16,
    pub link_collection: u16,
    pub usages: UsageSpec,
    pub logical_min: i32,
    pub logical_max: i32,
    pub physical_min: i32,
    pub physical_max: i32,
    pub bit_size: u16,
}

/// Everything a transport knows about a device's input report layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub buttons: Vec<ButtonCap>,
    pub values: Vec<ValueCap>,
}

impl CapabilitySet {
    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty() && self.values.is_empty()
    }
}

/// One value usage after expansion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisDescriptor {
    pub usage_page: u16,
    pub usage: u16,
    pub report_id: u8,
    pub link_collection: u16,
    pub data_index: u16,
    pub bit_size: u16,
    pub logical_min: i32,
    pub logical_max: i32,
    pub physical_min: i32,
    pub physical_max: i32,
    pub calibrated_min: i32,
    pub calibrated_center: i32,
    pub calibrated_max: i32,
    /// Set when the bounds came from a calibration store.
    pub is_calibrated: bool,
    pub name: String,
    /// `None` for surplus or unmapped usages; they are decoded but never surfaced.
    pub slot: Option<AxisSlot>,
}

impl AxisDescriptor {
    #[inline]
    pub fn is_hat(&self) -> bool {
        is_hat_switch(self.usage_page, self.usage)
    }

    /// Reset calibrated bounds to the logical range.
    pub fn reset_calibration(&mut self) {
        self.calibrated_min = self.logical_min;
        self.calibrated_max = self.logical_max;
        self.calibrated_center = midpoint(self.logical_min, self.logical_max);
        self.is_calibrated = false;
    }
}

/// One button usage after expansion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonDescriptor {
    pub usage_page: u16,
    pub usage: u16,
    pub report_id: u8,
    pub data_index: u16,
    /// Position in the device's button bit-set.
    pub index: usize,
    pub name: String,
}

/// A button capability entry kept intact for bulk "which usages are down" queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonGroup {
    pub report_id: u8,
    pub usage_page: u16,
    pub link_collection: u16,
    pub range: UsageRange,
    /// Bit index of `range.usage_min` in the button bit-set.
    pub first_button: usize,
}

impl ButtonGroup {
    /// Bit index for a usage of this group, if it lies in the range.
    pub fn button_index(&self, usage: u16) -> Option<usize> {
        self.range
            .contains(usage)
            .then(|| self.first_button + usize::from(usage - self.range.usage_min))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorSet {
    /// All value usages (axes and hats), ascending by data index.
    pub axes: Vec<AxisDescriptor>,
    /// All button usages, ascending by data index.
    pub buttons: Vec<ButtonDescriptor>,
    pub button_groups: Vec<ButtonGroup>,
}

impl DescriptorSet {
    pub fn axis(&self, slot: AxisSlot) -> Option<&AxisDescriptor> {
        self.axes.iter().find(|a| a.slot == Some(slot))
    }

    pub fn hat(&self) -> Option<&AxisDescriptor> {
        self.axes.iter().find(|a| a.is_hat())
    }

    pub fn mapped_axes(&self) -> impl Iterator<Item = &AxisDescriptor> {
        self.axes.iter().filter(|a| a.slot.is_some())
    }
}

#[inline]
pub(crate) fn midpoint(lo: i32, hi: i32) -> i32 {
    let lo = i64::from(lo);
    let hi = i64::from(hi);
    (lo + (hi - lo) / 2) as i32
}

/// Some descriptors declare unsigned fields whose logical maximum has the sign
/// bit set, which the platform then reports as a negative number.
fn logical_bounds(min: i32, max: i32, bit_size: u16) -> (i32, i32) {
    if max >= min {
        return (min, max);
    }
    if (1..32).contains(&bit_size) {
        let mask = (1i64 << bit_size) - 1;
        let unsigned = i64::from(max) & mask;
        if unsigned >= i64::from(min) {
            return (min, unsigned as i32);
        }
    }
    (max, min)
}

#[inline]
fn continues(prev: &UsageRange, next: &UsageRange) -> bool {
    prev.usage_max.checked_add(1) == Some(next.usage_min)
        && prev.data_index_max.checked_add(1) == Some(next.data_index_min)
}

/// Canonicalize entries and fold each one into its predecessor when `same_field`
/// holds and both usage and data index carry on by exactly one.
fn coalesce<'a, T>(
    entries: &'a [T],
    usages: impl Fn(&T) -> UsageSpec,
    same_field: impl Fn(&T, &T) -> bool,
) -> Vec<(&'a T, UsageRange)> {
    let mut out: Vec<(&'a T, UsageRange)> = Vec::with_capacity(entries.len());
    for entry in entries {
        let range = usages(entry).canonical();
        if let Some((head, merged)) = out.last_mut() {
            if same_field(*head, entry) && continues(merged, &range) {
                merged.usage_max = range.usage_max;
                merged.data_index_max = range.data_index_max;
                continue;
            }
        }
        out.push((entry, range));
    }
    out
}

fn same_button_field(a: &ButtonCap, b: &ButtonCap) -> bool {
    a.report_id == b.report_id
        && a.usage_page == b.usage_page
        && a.link_collection == b.link_collection
}

fn same_value_field(a: &ValueCap, b: &ValueCap) -> bool {
    a.report_id == b.report_id
        && a.usage_page == b.usage_page
        && a.link_collection == b.link_collection
        && a.logical_min == b.logical_min
        && a.logical_max == b.logical_max
        && a.physical_min == b.physical_min
        && a.physical_max == b.physical_max
        && a.bit_size == b.bit_size
}

/// Expand a capability set into per-usage descriptors for `class`.
///
/// Neighbouring entries of the same field that continue each other's usages
/// and data indices are merged first, so a bank of single-usage buttons becomes
/// one [`ButtonGroup`].
pub fn resolve(caps: &CapabilitySet, class: DeviceClass) -> DescriptorSet {
    let mut axes = Vec::new();
    for (cap, range) in coalesce(&caps.values, |c| c.usages, same_value_field) {
        let (logical_min, logical_max) =
            logical_bounds(cap.logical_min, cap.logical_max, cap.bit_size);
        for (usage, data_index) in range.iter() {
            let mut axis = AxisDescriptor {
                usage_page: cap.usage_page,
                usage,
                report_id: cap.report_id,
                link_collection: cap.link_collection,
                data_index,
                bit_size: cap.bit_size,
                logical_min,
                logical_max,
                physical_min: cap.physical_min,
                physical_max: cap.physical_max,
                calibrated_min: logical_min,
                calibrated_center: logical_min,
                calibrated_max: logical_max,
                is_calibrated: false,
                name: usage_name(cap.usage_page, usage),
                slot: None,
            };
            axis.reset_calibration();
            axes.push(axis);
        }
    }
    axes.sort_by_key(|a| a.data_index);
    assign_slots(&mut axes, class);

    let mut groups = Vec::with_capacity(caps.buttons.len());
    let mut buttons = Vec::new();
    let mut next_button = 0usize;
    for (cap, range) in coalesce(&caps.buttons, |c| c.usages, same_button_field) {
        groups.push(ButtonGroup {
            report_id: cap.report_id,
            usage_page: cap.usage_page,
            link_collection: cap.link_collection,
            range,
            first_button: next_button,
        });
        for (i, (usage, data_index)) in range.iter().enumerate() {
            buttons.push(ButtonDescriptor {
                usage_page: cap.usage_page,
                usage,
                report_id: cap.report_id,
                data_index,
                index: next_button + i,
                name: usage_name(cap.usage_page, usage),
            });
        }
        next_button += range.len();
    }
    buttons.sort_by_key(|b| b.data_index);

    DescriptorSet {
        axes,
        buttons,
        button_groups: groups,
    }
}

/// First descriptor of each usage wins its slot; the rest stay unmapped.
pub(crate) fn assign_slots(axes: &mut [AxisDescriptor], class: DeviceClass) {
    let mut taken = [false; AxisSlot::ALL.len()];
    for axis in axes.iter_mut() {
        axis.slot = None;
        let Some(slot) = AxisSlot::from_usage(axis.usage_page, axis.usage) else {
            continue;
        };
        if slot.index() >= class.axis_count() || taken[slot.index()] {
            continue;
        }
        taken[slot.index()] = true;
        axis.slot = Some(slot);
    }
}
