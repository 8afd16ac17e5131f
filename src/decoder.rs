//! Per-report decoding for joystick-shaped devices.
//!
//! For each mapped axis the decoder asks the [`ReportFields`] for a raw value,
//! normalizes it and stores it into the axis's slot. For each button group it
//! asks for the asserted usages and rebuilds the button bit-set from scratch.
//!
//! Failures are local: a field that cannot be read leaves that axis untouched
//! and a group that cannot be read contributes no pressed bits.
//!
//! ## Hat policy
//! Hats decode to [`HatDirection`]: `Centered` or one of 8 directions
//! (Up first, clockwise). Eight-count ranges are direction slots and four-count
//! ranges are the cardinal directions. Anything wider is a full turn measured
//! from the logical minimum and mapped to 45° sectors.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::caps::{AxisDescriptor, DescriptorSet};
use crate::fields::ReportFields;
use crate::normalize::normalize;
use crate::usage::AxisSlot;

/// Maximum number of buttons tracked per device.
pub const MAX_BUTTONS: usize = 32;

/// Normalized axis values, one per slot of the device class. Unmapped slots stay `0.0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisState {
    values: Vec<f32>,
}

impl AxisState {
    pub fn new(slots: usize) -> Self {
        Self { values: vec![0.0; slots] }
    }

    #[inline]
    pub fn get(&self, slot: AxisSlot) -> f32 {
        self.values.get(slot.index()).copied().unwrap_or(0.0)
    }

    /// Returns `false` if the slot does not exist for this device class.
    pub fn set(&mut self, slot: AxisSlot, value: f32) -> bool {
        match self.values.get_mut(slot.index()) {
            Some(v) => {
                *v = value;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.values.fill(0.0);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

/// Button bit-set, bit `i` = button `i`. Bits past `capacity` are never set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonState {
    bits: u32,
    capacity: u8,
}

impl ButtonState {
    pub fn with_capacity(buttons: usize) -> Self {
        Self { bits: 0, capacity: buttons.min(MAX_BUTTONS) as u8 }
    }

    #[inline]
    fn mask(&self) -> u32 {
        match self.capacity {
            0 => 0,
            c if usize::from(c) >= MAX_BUTTONS => u32::MAX,
            c => (1u32 << c) - 1,
        }
    }

    /// Replace all bits, dropping any past the capacity.
    pub fn set_bits(&mut self, bits: u32) {
        self.bits = bits & self.mask();
    }

    pub fn set(&mut self, index: usize, pressed: bool) {
        if index >= usize::from(self.capacity) {
            return;
        }
        if pressed {
            self.bits |= 1 << index;
        } else {
            self.bits &= !(1 << index);
        }
    }

    #[inline]
    pub fn is_pressed(&self, index: usize) -> bool {
        index < MAX_BUTTONS && self.bits & (1 << index) != 0
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        usize::from(self.capacity)
    }
}

/// Eight-way hat position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HatDirection {
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
    #[default]
    Centered,
}

impl HatDirection {
    const DIRECTIONS: [HatDirection; 8] = [
        HatDirection::Up,
        HatDirection::UpRight,
        HatDirection::Right,
        HatDirection::DownRight,
        HatDirection::Down,
        HatDirection::DownLeft,
        HatDirection::Left,
        HatDirection::UpLeft,
    ];

    /// Direction for a slot `0..8`; anything else is centered.
    pub fn from_slot(slot: i32) -> Self {
        usize::try_from(slot)
            .ok()
            .and_then(|i| Self::DIRECTIONS.get(i).copied())
            .unwrap_or(HatDirection::Centered)
    }

    /// `0..8` for directions, `8` for centered.
    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Decode a raw hat value against its logical range.
    pub fn from_raw(raw: i32, logical_min: i32, logical_max: i32) -> Self {
        if raw < logical_min || raw > logical_max {
            return HatDirection::Centered;
        }
        // Eight or four counts are slot encodings; wider ranges cover a full turn.
        let span = i64::from(logical_max) - i64::from(logical_min);
        let offset = i64::from(raw) - i64::from(logical_min);
        match span {
            7 => Self::from_slot(offset as i32),
            3 => Self::from_slot(offset as i32 * 2),
            _ => {
                let degrees = offset as f64 * 360.0 / (span + 1) as f64;
                let slot = ((degrees + 22.5) / 45.0).floor() as i64;
                Self::from_slot(slot.rem_euclid(8) as i32)
            }
        }
    }
}

/// Decoded state of a joystick, gamepad or multi-axis controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub axes: AxisState,
    pub buttons: ButtonState,
    /// Only tracked for classes with a hat.
    pub hat: Option<HatDirection>,
}

impl ControllerState {
    pub fn new(axis_slots: usize, buttons: usize, has_hat: bool) -> Self {
        Self {
            axes: AxisState::new(axis_slots),
            buttons: ButtonState::with_capacity(buttons),
            hat: has_hat.then_some(HatDirection::Centered),
        }
    }
}

/// What one [`decode_report`] call changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodeSummary {
    pub changed_axes: Vec<(AxisSlot, f32)>,
    pub hat_changed: bool,
    pub buttons_changed: bool,
    /// Axes and groups skipped because their field could not be read.
    pub skipped: usize,
}

impl DecodeSummary {
    pub fn is_empty(&self) -> bool {
        self.changed_axes.is_empty() && !self.hat_changed && !self.buttons_changed
    }
}

fn read_axis(
    report: &[u8],
    axis: &AxisDescriptor,
    fields: &dyn ReportFields,
    skipped: &mut usize,
) -> Option<i32> {
    match fields.value(report, axis) {
        Ok(raw) => Some(raw),
        Err(e) => {
            debug!(usage_page = axis.usage_page, usage = axis.usage, error = %e, "axis skipped");
            *skipped += 1;
            None
        }
    }
}

/// Decode one report into `state`.
pub fn decode_report(
    report: &[u8],
    descriptors: &DescriptorSet,
    fields: &dyn ReportFields,
    state: &mut ControllerState,
) -> DecodeSummary {
    let mut summary = DecodeSummary::default();

    for axis in &descriptors.axes {
        if axis.is_hat() {
            if state.hat.is_none() {
                continue;
            }
            if let Some(raw) = read_axis(report, axis, fields, &mut summary.skipped) {
                let hat = HatDirection::from_raw(raw, axis.logical_min, axis.logical_max);
                if state.hat != Some(hat) {
                    state.hat = Some(hat);
                    summary.hat_changed = true;
                }
            }
            continue;
        }
        let Some(slot) = axis.slot else {
            continue;
        };
        if let Some(raw) = read_axis(report, axis, fields, &mut summary.skipped) {
            let v = normalize(raw, axis);
            if state.axes.get(slot) != v && state.axes.set(slot, v) {
                summary.changed_axes.push((slot, v));
            }
        }
    }

    let mut buttons = ButtonState::with_capacity(state.buttons.capacity());
    for group in &descriptors.button_groups {
        match fields.pressed_usages(report, group) {
            Ok(usages) => {
                for usage in usages {
                    if let Some(index) = group.button_index(usage) {
                        buttons.set(index, true);
                    }
                }
            }
            Err(e) => {
                debug!(usage_page = group.usage_page, error = %e, "button group skipped");
                summary.skipped += 1;
            }
        }
    }
    summary.buttons_changed = buttons != state.buttons;
    state.buttons = buttons;

    summary
}
