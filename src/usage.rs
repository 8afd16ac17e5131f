//! HID usage constants and semantic axis slots.
//!
//! Only the pages this crate interprets are listed. Everything else is carried
//! through as raw `(usage_page, usage)` pairs and named generically.

use serde::{Deserialize, Serialize};

/// Usage pages.
pub mod page {
    pub const GENERIC_DESKTOP: u16 = 0x01;
    pub const SIMULATION: u16 = 0x02;
    pub const BUTTON: u16 = 0x09;

    /// Calibration-store mappings naming a page at or above this value are ignored.
    pub const CALIBRATION_LIMIT: u16 = 0x15;
}

/// Generic Desktop usages.
pub mod generic {
    pub const POINTER: u16 = 0x01;
    pub const MOUSE: u16 = 0x02;
    pub const JOYSTICK: u16 = 0x04;
    pub const GAMEPAD: u16 = 0x05;
    pub const KEYBOARD: u16 = 0x06;
    pub const MULTI_AXIS: u16 = 0x08;

    pub const X: u16 = 0x30;
    pub const Y: u16 = 0x31;
    pub const Z: u16 = 0x32;
    pub const RX: u16 = 0x33;
    pub const RY: u16 = 0x34;
    pub const RZ: u16 = 0x35;
    pub const SLIDER: u16 = 0x36;
    pub const DIAL: u16 = 0x37;
    pub const WHEEL: u16 = 0x38;
    pub const HAT_SWITCH: u16 = 0x39;
}

/// Semantic position of an axis in a device's axis state.
///
/// The first seven slots mirror the DirectInput object order
/// (`X, Y, Z, Rx, Ry, Rz, Slider`); `Dial` is an extra generic slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisSlot {
    X,
    Y,
    Z,
    Rx,
    Ry,
    Rz,
    Slider,
    Dial,
}

impl AxisSlot {
    pub const ALL: [AxisSlot; 8] = [
        AxisSlot::X,
        AxisSlot::Y,
        AxisSlot::Z,
        AxisSlot::Rx,
        AxisSlot::Ry,
        AxisSlot::Rz,
        AxisSlot::Slider,
        AxisSlot::Dial,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The slot a Generic Desktop usage naturally occupies, if any.
    pub fn from_usage(usage_page: u16, usage: u16) -> Option<Self> {
        if usage_page != page::GENERIC_DESKTOP || usage < generic::X {
            return None;
        }
        Self::from_index(usize::from(usage - generic::X))
    }

    /// Generic Desktop usage code for this slot.
    #[inline]
    pub fn usage(self) -> u16 {
        generic::X + self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            AxisSlot::X => "X",
            AxisSlot::Y => "Y",
            AxisSlot::Z => "Z",
            AxisSlot::Rx => "Rx",
            AxisSlot::Ry => "Ry",
            AxisSlot::Rz => "Rz",
            AxisSlot::Slider => "Slider",
            AxisSlot::Dial => "Dial",
        }
    }
}

impl std::fmt::Display for AxisSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[inline]
pub fn is_hat_switch(usage_page: u16, usage: u16) -> bool {
    usage_page == page::GENERIC_DESKTOP && usage == generic::HAT_SWITCH
}

/// Friendly name for a usage, falling back to a hex label.
pub fn usage_name(usage_page: u16, usage: u16) -> String {
    match usage_page {
        page::GENERIC_DESKTOP => match usage {
            generic::X..=generic::DIAL => AxisSlot::from_usage(usage_page, usage)
                .map(|s| s.name().to_string())
                .unwrap_or_default(),
            generic::WHEEL => "Wheel".to_string(),
            generic::HAT_SWITCH => "Hat".to_string(),
            _ => format!("GD_{usage:#04x}"),
        },
        page::SIMULATION => match usage {
            0xB0 => "Accelerator".to_string(),
            0xB1 => "Brake".to_string(),
            0xB2 => "Clutch".to_string(),
            0xBB => "Throttle".to_string(),
            _ => "Sim".to_string(),
        },
        page::BUTTON => format!("Button {usage}"),
        p if p & 0xFF00 == 0xFF00 => "Vendor".to_string(),
        _ => format!("UP_{usage_page:04x}_U_{usage:04x}"),
    }
}
