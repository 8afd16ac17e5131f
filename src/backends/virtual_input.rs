//! Scripted in-memory transport.
//!
//! [`MemoryTransport`] stands in for real hardware: register devices with their
//! capabilities and bit layout, then [`feed`](MemoryTransport::feed) raw reports
//! that [`Manager::poll`](crate::manager::Manager::poll) will read back in order.

use std::collections::{BTreeMap, VecDeque};

use crate::caps::CapabilitySet;
use crate::error::TransportError;
use crate::fields::{BitLayout, ReportFields};
use crate::transport::{DeviceId, DeviceInfo, InputTransport};

#[derive(Clone, Debug)]
struct MemoryDevice {
    info: DeviceInfo,
    caps: CapabilitySet,
    layout: BitLayout,
    pending: VecDeque<Vec<u8>>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryTransport {
    devices: BTreeMap<DeviceId, MemoryDevice>,
    closed: Vec<DeviceId>,
    next_id: u64,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device. The id in `info` is replaced by a fresh one.
    pub fn add_device(&mut self, mut info: DeviceInfo, caps: CapabilitySet, layout: BitLayout) -> DeviceId {
        self.next_id += 1;
        let id = DeviceId(self.next_id);
        info.id = id;
        self.devices.insert(
            id,
            MemoryDevice { info, caps, layout, pending: VecDeque::new() },
        );
        id
    }

    /// Unplug a device; it disappears from the next enumeration.
    pub fn remove_device(&mut self, id: DeviceId) -> bool {
        self.devices.remove(&id).is_some()
    }

    /// Queue one report for `id`. Returns `false` for unknown ids.
    pub fn feed(&mut self, id: DeviceId, report: impl Into<Vec<u8>>) -> bool {
        match self.devices.get_mut(&id) {
            Some(dev) => {
                dev.pending.push_back(report.into());
                true
            }
            None => false,
        }
    }

    pub fn pending(&self, id: DeviceId) -> usize {
        self.devices.get(&id).map_or(0, |d| d.pending.len())
    }

    /// Devices released through [`InputTransport::close`], oldest first.
    pub fn closed(&self) -> &[DeviceId] {
        &self.closed
    }

    fn device(&self, id: DeviceId) -> Result<&MemoryDevice, TransportError> {
        self.devices.get(&id).ok_or(TransportError::UnknownDevice(id.0))
    }
}

impl InputTransport for MemoryTransport {
    fn enumerate_devices(&mut self) -> Result<Vec<DeviceInfo>, TransportError> {
        Ok(self.devices.values().map(|d| d.info.clone()).collect())
    }

    fn query_capabilities(&mut self, id: DeviceId) -> Result<CapabilitySet, TransportError> {
        Ok(self.device(id)?.caps.clone())
    }

    fn report_fields(&mut self, id: DeviceId) -> Result<Box<dyn ReportFields + Send>, TransportError> {
        Ok(Box::new(self.device(id)?.layout.clone()))
    }

    fn read_report(&mut self, id: DeviceId, buf: &mut [u8]) -> Result<usize, TransportError> {
        let dev = self
            .devices
            .get_mut(&id)
            .ok_or(TransportError::UnknownDevice(id.0))?;
        let Some(report) = dev.pending.pop_front() else {
            return Ok(0);
        };
        let n = report.len().min(buf.len());
        buf[..n].copy_from_slice(&report[..n]);
        Ok(n)
    }

    fn close(&mut self, id: DeviceId) {
        self.closed.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_come_back_in_order() {
        let mut t = MemoryTransport::new();
        let id = t.add_device(DeviceInfo::default(), CapabilitySet::default(), BitLayout::new());
        assert_eq!(id, DeviceId(1));
        assert!(t.feed(id, vec![1, 2, 3]));
        assert!(t.feed(id, vec![4]));
        assert!(!t.feed(DeviceId(99), vec![0]));

        let mut buf = [0u8; 8];
        assert_eq!(t.read_report(id, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(t.read_report(id, &mut buf).unwrap(), 1);
        assert_eq!(t.read_report(id, &mut buf).unwrap(), 0);
        assert!(matches!(
            t.read_report(DeviceId(99), &mut buf),
            Err(TransportError::UnknownDevice(99))
        ));
    }

    #[test]
    fn enumeration_reflects_unplug() {
        let mut t = MemoryTransport::new();
        let a = t.add_device(DeviceInfo::default(), CapabilitySet::default(), BitLayout::new());
        let b = t.add_device(DeviceInfo::default(), CapabilitySet::default(), BitLayout::new());
        assert_eq!(t.enumerate_devices().unwrap().len(), 2);
        assert!(t.remove_device(a));
        let ids: Vec<_> = t.enumerate_devices().unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![b]);
    }
}
