//! Produced events.
//!
//! Every device reports through [`InputEvent`]s tagged with its [`DeviceId`]
//! and the host timestamp of the report (or tick) that caused them.
//!
//! ## Value conventions
//! - **Axes:** normalized to `[-1.0, 1.0]`, keyed by [`AxisSlot`].
//! - **Buttons:** a full [`ButtonState`] bit-set per decoded report.
//! - **Hats:** [`HatDirection`], `Centered` when released.
//! - **Motion:** six per-frame displacements `[x, y, z, rx, ry, rz]`, already
//!   scaled by speed and elapsed time. Not normalized.
//! - **Keys:** virtual key codes after the per-model remap; see
//!   [`crate::virtual_keys`].

use serde::{Deserialize, Serialize};

use crate::decoder::{AxisState, ButtonState, HatDirection};
use crate::transport::DeviceId;
use crate::usage::AxisSlot;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InputKind {
    /// One mapped axis changed value.
    AxisChanged { slot: AxisSlot, value: f32 },

    /// Full state after a report was decoded.
    StateUpdated { axes: AxisState, buttons: ButtonState },

    HatChanged { hat: HatDirection },

    /// Space mouse displacement for one frame.
    Motion { motion: [f32; 6] },

    KeyDown { key: u16 },

    KeyUp { key: u16 },
}

impl InputKind {
    #[inline]
    pub fn is_axis(&self) -> bool {
        matches!(self, InputKind::AxisChanged { .. } | InputKind::HatChanged { .. })
    }

    #[inline]
    pub fn is_button(&self) -> bool {
        matches!(self, InputKind::KeyDown { .. } | InputKind::KeyUp { .. })
    }

    #[inline]
    pub fn is_motion(&self) -> bool {
        matches!(self, InputKind::Motion { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub device: DeviceId,
    /// Host timestamp (milliseconds) of the report or tick that produced the event.
    pub at_ms: u32,
    pub kind: InputKind,
}
