//! The boundary to whatever enumerates devices and reads their reports.
//!
//! An [`InputTransport`] is the crate's only view of the platform. Reports can
//! also be pushed in directly through
//! [`Manager::deliver`](crate::manager::Manager::deliver) by hosts that own a
//! message loop.

use serde::{Deserialize, Serialize};

use crate::caps::CapabilitySet;
use crate::error::TransportError;
use crate::fields::ReportFields;

/// Transport-assigned device handle, stable while the device stays attached.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DeviceId(pub u64);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dev{}", self.0)
    }
}

/// What enumeration knows about one device interface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub vendor_id: u16,
    pub product_id: u16,
    pub vendor_name: Option<String>,
    pub product_name: Option<String>,
    pub serial_number: Option<String>,
    /// Top-level collection usage page/usage.
    pub usage_page: u16,
    pub usage: u16,
    /// Platform path, opaque.
    pub path: Option<String>,
}

pub trait InputTransport {
    fn enumerate_devices(&mut self) -> Result<Vec<DeviceInfo>, TransportError>;

    fn query_capabilities(&mut self, id: DeviceId) -> Result<CapabilitySet, TransportError>;

    /// Field extractor matching the capabilities of `id`.
    fn report_fields(&mut self, id: DeviceId) -> Result<Box<dyn ReportFields + Send>, TransportError>;

    /// Read one pending report into `buf`. `Ok(0)` means nothing is pending.
    fn read_report(&mut self, id: DeviceId, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Release per-device resources after detach.
    fn close(&mut self, _id: DeviceId) {}
}
