//! Per-frame snapshot of device states.
//!
//! [`Snapshot`] is an **owned**, read-only view of every attached device at a
//! point in time, produced by [`Manager::snapshot`](crate::manager::Manager::snapshot).
//! It does not poll; it reflects the last decoded report or tick.
//!
//! # Examples
//! ```
//! use hidmotion::{AxisSlot, Snapshot};
//!
//! fn print_x(snap: &Snapshot) {
//!     for (dev, state) in snap.iter() {
//!         println!("{dev}: X={:.2} buttons={:#x}", state.axes.get(AxisSlot::X), state.buttons.bits());
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::device::DeviceState;
use crate::transport::DeviceId;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot(pub BTreeMap<DeviceId, DeviceState>);

impl Snapshot {
    #[inline]
    pub fn get(&self, device: DeviceId) -> Option<&DeviceState> {
        self.0.get(&device)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &DeviceState)> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn into_inner(self) -> BTreeMap<DeviceId, DeviceState> {
        self.0
    }
}
