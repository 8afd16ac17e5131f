//! Multi-device routing.
//!
//! The [`Manager`] owns a transport, the attached [`Device`]s, the timer queue
//! for polling-mode space mice and the application focus state. Hosts drive it
//! with a millisecond clock:
//!
//! - [`Manager::discover`] enumerates and attaches supported devices.
//! - [`Manager::poll`] reads pending reports from the transport and fires due timers,
//!   or [`Manager::deliver`] + [`Manager::tick`] for hosts that receive reports themselves.
//! - [`Manager::set_foreground`] forwards application (de)activation.
//!
//! All work happens on the caller's thread. Each device is only ever touched by
//! one call at a time.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::calibration::{CalibrationStore, NoCalibration};
use crate::caps::DescriptorSet;
use crate::config::Config;
use crate::device::{Device, DeviceClass};
use crate::error::{Result, TransportError};
use crate::eventbus::{EventFilter, InputEventBus, InputListener};
use crate::metadata::DeviceIdentity;
use crate::motion::{Focus, ReportContext};
use crate::snapshot::Snapshot;
use crate::timer::{TimerQueue, TimerService};
use crate::transport::{DeviceId, DeviceInfo, InputTransport};

/// Upper bound on reports drained per device per [`Manager::poll`].
pub const MAX_REPORTS_PER_POLL: usize = 32;

const READ_BUFFER_LEN: usize = 256;

#[derive(Serialize)]
struct DeviceReport<'a> {
    id: DeviceId,
    class: DeviceClass,
    identity: &'a DeviceIdentity,
    descriptors: &'a DescriptorSet,
}

pub struct Manager<T: InputTransport> {
    transport: T,
    store: Box<dyn CalibrationStore>,
    config: Config,
    devices: BTreeMap<DeviceId, Device>,
    timers: TimerQueue,
    focus: Focus,
    buf: Vec<u8>,
}

impl<T: InputTransport> Manager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            store: Box::new(NoCalibration),
            config: Config::default(),
            devices: BTreeMap::new(),
            timers: TimerQueue::new(),
            focus: Focus::Foreground,
            buf: vec![0; READ_BUFFER_LEN],
        }
    }

    /// Calibration source used for devices attached from now on.
    #[must_use]
    pub fn with_calibration(mut self, store: impl CalibrationStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Enumerate and attach every supported device not attached yet.
    pub fn discover(&mut self) -> Result<Vec<DeviceId>, TransportError> {
        self.discover_with(|_| InputEventBus::new())
    }

    /// Like [`discover`](Self::discover), building each device's subscriber list with `make_bus`.
    pub fn discover_with(
        &mut self,
        mut make_bus: impl FnMut(&DeviceInfo) -> InputEventBus,
    ) -> Result<Vec<DeviceId>, TransportError> {
        let infos = self.transport.enumerate_devices()?;
        let mut attached = Vec::new();
        for info in infos {
            if self.devices.contains_key(&info.id) {
                continue;
            }
            let bus = make_bus(&info);
            if let Some(id) = self.attach(&info, bus) {
                attached.push(id);
            }
        }
        info!(attached = attached.len(), total = self.devices.len(), "discovery finished");
        Ok(attached)
    }

    /// Attach one device. Returns `None` for unsupported or already attached devices.
    pub fn attach(&mut self, info: &DeviceInfo, bus: InputEventBus) -> Option<DeviceId> {
        if self.devices.contains_key(&info.id) {
            return None;
        }
        let Some(class) = DeviceClass::classify(info) else {
            debug!(
                device = %info.id,
                usage_page = info.usage_page,
                usage = info.usage,
                "skipping unsupported interface"
            );
            return None;
        };
        let config = self.config.for_device(info.vendor_id, info.product_id);
        let device = Device::attach(info, class, &mut self.transport, &*self.store, config, bus);
        self.devices.insert(info.id, device);
        Some(info.id)
    }

    /// Stop the device's timer, drop its state and release it in the transport.
    pub fn detach(&mut self, id: DeviceId) -> Option<DeviceIdentity> {
        let device = self.devices.remove(&id)?;
        let identity = device.detach(&mut self.timers);
        self.transport.close(id);
        Some(identity)
    }

    pub fn subscribe(
        &mut self,
        id: DeviceId,
        listener: impl InputListener + 'static,
        filter: EventFilter,
    ) -> Option<u64> {
        let device = self.devices.get_mut(&id)?;
        Some(device.bus_mut().add_listener(listener, filter, None))
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(&id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Feed one report for `id`. Returns `false` if the device is not attached.
    pub fn deliver(&mut self, id: DeviceId, report: &[u8], timestamp_ms: u32) -> bool {
        self.timers.observe(timestamp_ms);
        let Some(device) = self.devices.get_mut(&id) else {
            return false;
        };
        let ctx = ReportContext { timestamp_ms, focus: self.focus };
        device.handle_report(report, ctx, &mut self.timers);
        true
    }

    /// Fire due polling timers.
    pub fn tick(&mut self, now_ms: u32) {
        for (handle, id) in self.timers.due(now_ms) {
            match self.devices.get_mut(&id) {
                Some(device) => device.handle_tick(handle, now_ms, self.focus, &mut self.timers),
                None => self.timers.stop(handle),
            }
        }
    }

    /// Drain pending reports from the transport, then fire due timers.
    ///
    /// Returns the number of reports delivered.
    pub fn poll(&mut self, now_ms: u32) -> usize {
        self.timers.observe(now_ms);
        let ctx = ReportContext { timestamp_ms: now_ms, focus: self.focus };
        let mut delivered = 0;
        for (id, device) in self.devices.iter_mut() {
            for _ in 0..MAX_REPORTS_PER_POLL {
                match self.transport.read_report(*id, &mut self.buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        let n = n.min(self.buf.len());
                        device.handle_report(&self.buf[..n], ctx, &mut self.timers);
                        delivered += 1;
                    }
                    Err(e) => {
                        warn!(device = %id, error = %e, "read failed");
                        break;
                    }
                }
            }
        }
        self.tick(now_ms);
        delivered
    }

    /// Application gained (`true`) or lost input focus.
    pub fn set_foreground(&mut self, active: bool) {
        self.focus = if active { Focus::Foreground } else { Focus::Background };
        for device in self.devices.values_mut() {
            device.set_active(active);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(
            self.devices
                .iter()
                .map(|(id, d)| (*id, d.state()))
                .collect(),
        )
    }

    /// Identity and resolved descriptors of every device, as pretty JSON.
    pub fn device_report_json(&self) -> Result<String> {
        let reports: Vec<DeviceReport<'_>> = self
            .devices
            .values()
            .map(|d| DeviceReport {
                id: d.id(),
                class: d.class(),
                identity: d.identity(),
                descriptors: d.descriptors(),
            })
            .collect();
        Ok(serde_json::to_string_pretty(&reports)?)
    }
}

impl<T: InputTransport> Drop for Manager<T> {
    fn drop(&mut self) {
        let ids: Vec<DeviceId> = self.devices.keys().copied().collect();
        for id in ids {
            self.detach(id);
        }
    }
}
