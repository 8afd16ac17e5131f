//! Space mouse button remapping.
//!
//! Older space mice report their buttons as positional HID key numbers whose
//! meaning depends on the model. Those models get a lookup table from HID key
//! number to a [`VirtualKey`]; newer models already report virtual key codes
//! and pass through unchanged.
//!
//! Remapped keys are plain `u16` codes: table models only ever produce
//! [`VirtualKey`] discriminants, pass-through models may produce any value.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Logitech (legacy 3Dconnexion) USB vendor id.
pub const LOGITECH_VENDOR_ID: u16 = 0x046d;
/// 3Dconnexion USB vendor id used by current models.
pub const CONNEXION_VENDOR_ID: u16 = 0x256f;

/// Product ids with dedicated handling.
pub mod product {
    pub const SPACE_PILOT: u16 = 0xc625;
    pub const SPACE_NAVIGATOR: u16 = 0xc626;
    pub const SPACE_EXPLORER: u16 = 0xc627;
    pub const SPACE_NAVIGATOR_FOR_NOTEBOOKS: u16 = 0xc628;
    pub const SPACE_PILOT_PRO: u16 = 0xc629;
}

/// Virtual key codes understood by 3D navigation hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum VirtualKey {
    Invalid = 0,
    Menu = 1,
    Fit,
    Top,
    Left,
    Right,
    Front,
    Bottom,
    Back,
    Cw,
    Ccw,
    Iso1,
    Iso2,
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
    K8,
    K9,
    K10,
    Esc,
    Alt,
    Shift,
    Ctrl,
    Rotate,
    PanZoom,
    Dominant,
    Plus,
    Minus,
}

impl VirtualKey {
    const ALL: [VirtualKey; 32] = [
        VirtualKey::Invalid,
        VirtualKey::Menu,
        VirtualKey::Fit,
        VirtualKey::Top,
        VirtualKey::Left,
        VirtualKey::Right,
        VirtualKey::Front,
        VirtualKey::Bottom,
        VirtualKey::Back,
        VirtualKey::Cw,
        VirtualKey::Ccw,
        VirtualKey::Iso1,
        VirtualKey::Iso2,
        VirtualKey::K1,
        VirtualKey::K2,
        VirtualKey::K3,
        VirtualKey::K4,
        VirtualKey::K5,
        VirtualKey::K6,
        VirtualKey::K7,
        VirtualKey::K8,
        VirtualKey::K9,
        VirtualKey::K10,
        VirtualKey::Esc,
        VirtualKey::Alt,
        VirtualKey::Shift,
        VirtualKey::Ctrl,
        VirtualKey::Rotate,
        VirtualKey::PanZoom,
        VirtualKey::Dominant,
        VirtualKey::Plus,
        VirtualKey::Minus,
    ];

    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }
}

use VirtualKey as V;

const SPACE_EXPLORER_KEYS: &[VirtualKey] = &[
    V::Invalid,
    V::K1,
    V::K2,
    V::Top,
    V::Left,
    V::Right,
    V::Front,
    V::Esc,
    V::Alt,
    V::Shift,
    V::Ctrl,
    V::Fit,
    V::Menu,
    V::Plus,
    V::Minus,
    V::Rotate,
];

const SPACE_PILOT_KEYS: &[VirtualKey] = &[
    V::Invalid,
    V::K1,
    V::K2,
    V::K3,
    V::K4,
    V::K5,
    V::K6,
    V::Top,
    V::Left,
    V::Right,
    V::Front,
    V::Esc,
    V::Alt,
    V::Shift,
    V::Ctrl,
    V::Fit,
    V::Menu,
    V::Plus,
    V::Minus,
    V::Dominant,
    V::Rotate,
];

const LEGACY_LAYOUTS: &[(u16, &[VirtualKey])] = &[
    (product::SPACE_EXPLORER, SPACE_EXPLORER_KEYS),
    (product::SPACE_PILOT, SPACE_PILOT_KEYS),
];

/// Per-product HID key → virtual key tables.
#[derive(Clone, Debug, Default)]
pub struct VirtualKeyTable {
    layouts: HashMap<u16, Vec<VirtualKey>>,
}

impl VirtualKeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in tables for legacy models.
    pub fn legacy() -> &'static VirtualKeyTable {
        static TABLE: OnceLock<VirtualKeyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let mut table = VirtualKeyTable::new();
            for (pid, keys) in LEGACY_LAYOUTS {
                table.insert(*pid, keys.to_vec());
            }
            table
        })
    }

    pub fn insert(&mut self, product_id: u16, keys: Vec<VirtualKey>) {
        self.layouts.insert(product_id, keys);
    }

    pub fn has_layout(&self, product_id: u16) -> bool {
        self.layouts.contains_key(&product_id)
    }

    /// Translate a 1-based HID key number for `product_id`.
    ///
    /// Table models yield `0` ([`VirtualKey::Invalid`]) for numbers past the
    /// end of their table.
    pub fn remap(&self, product_id: u16, hid_key: u16) -> u16 {
        match self.layouts.get(&product_id) {
            Some(keys) => keys
                .get(usize::from(hid_key))
                .copied()
                .unwrap_or(VirtualKey::Invalid)
                .code(),
            None => hid_key,
        }
    }
}
