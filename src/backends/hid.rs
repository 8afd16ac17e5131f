//! `hidapi` transport.
//!
//! Enumerates every HID interface, hands out [`DeviceId`]s that stay stable per
//! interface path while the transport lives, and reads reports without
//! blocking. Handles are opened on first read and released on
//! [`close`](InputTransport::close).
//!
//! Capability queries need the platform HID parser and are only available on
//! Windows; elsewhere devices attach without descriptors.

use std::collections::{BTreeMap, HashMap};
use std::ffi::CString;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, warn};

use crate::caps::CapabilitySet;
use crate::error::TransportError;
use crate::fields::ReportFields;
use crate::transport::{DeviceId, DeviceInfo, InputTransport};

struct Entry {
    path: CString,
}

pub struct HidapiTransport {
    api: HidApi,
    entries: BTreeMap<DeviceId, Entry>,
    ids_by_path: HashMap<CString, DeviceId>,
    open: HashMap<DeviceId, HidDevice>,
    next_id: u64,
}

impl std::fmt::Debug for HidapiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidapiTransport")
            .field("devices", &self.entries.len())
            .field("open", &self.open.len())
            .finish()
    }
}

impl HidapiTransport {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self::with_api(HidApi::new()?))
    }

    pub fn with_api(api: HidApi) -> Self {
        Self {
            api,
            entries: BTreeMap::new(),
            ids_by_path: HashMap::new(),
            open: HashMap::new(),
            next_id: 0,
        }
    }

    fn entry(&self, id: DeviceId) -> Result<&Entry, TransportError> {
        self.entries.get(&id).ok_or(TransportError::UnknownDevice(id.0))
    }

    fn handle(&mut self, id: DeviceId) -> Result<&HidDevice, TransportError> {
        if !self.open.contains_key(&id) {
            let entry = self.entries.get(&id).ok_or(TransportError::UnknownDevice(id.0))?;
            let dev = self.api.open_path(&entry.path)?;
            dev.set_blocking_mode(false)?;
            debug!(device = %id, "opened hid handle");
            self.open.insert(id, dev);
        }
        self.open.get(&id).ok_or(TransportError::UnknownDevice(id.0))
    }
}

impl InputTransport for HidapiTransport {
    fn enumerate_devices(&mut self) -> Result<Vec<DeviceInfo>, TransportError> {
        self.api.refresh_devices()?;
        let mut seen = Vec::new();
        for hid in self.api.device_list() {
            let path = hid.path().to_owned();
            let id = match self.ids_by_path.get(&path) {
                Some(id) => *id,
                None => {
                    self.next_id += 1;
                    let id = DeviceId(self.next_id);
                    self.ids_by_path.insert(path.clone(), id);
                    id
                }
            };
            let info = DeviceInfo {
                id,
                vendor_id: hid.vendor_id(),
                product_id: hid.product_id(),
                vendor_name: hid.manufacturer_string().map(str::to_owned),
                product_name: hid.product_string().map(str::to_owned),
                serial_number: hid.serial_number().map(str::to_owned),
                usage_page: hid.usage_page(),
                usage: hid.usage(),
                path: Some(path.to_string_lossy().into_owned()),
            };
            self.entries.insert(id, Entry { path });
            seen.push(info);
        }
        // Unplugged interfaces disappear from the table; their ids are not reused.
        let live: Vec<DeviceId> = seen.iter().map(|i| i.id).collect();
        self.entries.retain(|id, _| live.contains(id));
        self.open.retain(|id, _| live.contains(id));
        Ok(seen)
    }

    #[cfg(target_os = "windows")]
    fn query_capabilities(&mut self, id: DeviceId) -> Result<CapabilitySet, TransportError> {
        let path = self.entry(id)?.path.to_string_lossy().into_owned();
        Ok(crate::backends::windows::HidpDevice::open(&path)?.capabilities())
    }

    #[cfg(not(target_os = "windows"))]
    fn query_capabilities(&mut self, id: DeviceId) -> Result<CapabilitySet, TransportError> {
        self.entry(id)?;
        Err(TransportError::Unsupported("capability queries need the Windows HID parser"))
    }

    #[cfg(target_os = "windows")]
    fn report_fields(&mut self, id: DeviceId) -> Result<Box<dyn ReportFields + Send>, TransportError> {
        let path = self.entry(id)?.path.to_string_lossy().into_owned();
        Ok(Box::new(crate::backends::windows::HidpDevice::open(&path)?))
    }

    #[cfg(not(target_os = "windows"))]
    fn report_fields(&mut self, id: DeviceId) -> Result<Box<dyn ReportFields + Send>, TransportError> {
        self.entry(id)?;
        Err(TransportError::Unsupported("field extraction needs the Windows HID parser"))
    }

    fn read_report(&mut self, id: DeviceId, buf: &mut [u8]) -> Result<usize, TransportError> {
        let result = self.handle(id)?.read(buf);
        match result {
            Ok(n) => Ok(n),
            Err(e) => {
                // Drop the handle; the next read reopens it.
                warn!(device = %id, error = %e, "hid read failed");
                self.open.remove(&id);
                Err(e.into())
            }
        }
    }

    fn close(&mut self, id: DeviceId) {
        if self.open.remove(&id).is_some() {
            debug!(device = %id, "closed hid handle");
        }
    }
}
