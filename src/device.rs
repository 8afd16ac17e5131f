//! Attached devices.
//!
//! A [`Device`] is composed of its identity, one resolved [`DescriptorSet`]
//! and a [`ClassState`] chosen by [`DeviceClass`]. Joystick-shaped classes
//! decode reports through [`decode_report`]; space mice go through the
//! [`MotionAggregator`]. Each device owns its [`InputEventBus`].
//!
//! Attach never fails because of capabilities: a device whose capabilities
//! cannot be queried attaches with empty descriptors and reports nothing.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calibration::{resolve_calibration, CalibrationStore};
use crate::caps::{self, CapabilitySet, DescriptorSet};
use crate::config::DeviceConfig;
use crate::decoder::{decode_report, AxisState, ButtonState, ControllerState, HatDirection, MAX_BUTTONS};
use crate::event::{InputEvent, InputKind};
use crate::eventbus::InputEventBus;
use crate::fields::{NoFields, ReportFields};
use crate::metadata::DeviceIdentity;
use crate::motion::{Focus, MotionAggregator, MotionFrame, ReportContext};
use crate::timer::{TimerHandle, TimerService};
use crate::transport::{DeviceId, DeviceInfo, InputTransport};
use crate::usage::{generic, page};
use crate::virtual_keys::{product, CONNEXION_VENDOR_ID, LOGITECH_VENDOR_ID};

/// Semantic category; fixes the slot count and what state is tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    Joystick,
    Gamepad,
    MultiAxisController,
    SpaceMotionController,
}

const CONNEXION_LEGACY_PRODUCTS: &[u16] = &[
    product::SPACE_PILOT,
    product::SPACE_NAVIGATOR,
    product::SPACE_EXPLORER,
    product::SPACE_NAVIGATOR_FOR_NOTEBOOKS,
    product::SPACE_PILOT_PRO,
];

impl DeviceClass {
    /// Number of axis slots (`X` first, in [`AxisSlot`](crate::usage::AxisSlot) order).
    pub fn axis_count(self) -> usize {
        match self {
            DeviceClass::Joystick | DeviceClass::MultiAxisController => 8,
            DeviceClass::Gamepad | DeviceClass::SpaceMotionController => 6,
        }
    }

    #[inline]
    pub fn has_hat(self) -> bool {
        self == DeviceClass::Gamepad
    }

    pub fn is_space_mouse(vendor_id: u16, product_id: u16) -> bool {
        vendor_id == CONNEXION_VENDOR_ID
            || (vendor_id == LOGITECH_VENDOR_ID && CONNEXION_LEGACY_PRODUCTS.contains(&product_id))
    }

    /// Class for an enumerated interface, `None` for anything this crate ignores.
    pub fn classify(info: &DeviceInfo) -> Option<DeviceClass> {
        if info.usage_page != page::GENERIC_DESKTOP {
            return None;
        }
        if Self::is_space_mouse(info.vendor_id, info.product_id) {
            return matches!(info.usage, generic::MULTI_AXIS | generic::JOYSTICK)
                .then_some(DeviceClass::SpaceMotionController);
        }
        match info.usage {
            generic::JOYSTICK => Some(DeviceClass::Joystick),
            generic::GAMEPAD => Some(DeviceClass::Gamepad),
            generic::MULTI_AXIS => Some(DeviceClass::MultiAxisController),
            _ => None,
        }
    }
}

/// Per-class mutable state.
#[derive(Debug)]
pub enum ClassState {
    Controller(ControllerState),
    SpaceMotion(MotionAggregator),
}

/// Owned copy of a device's current values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub class: DeviceClass,
    pub axes: AxisState,
    pub buttons: ButtonState,
    pub hat: Option<HatDirection>,
    /// Space mice only.
    pub motion: Option<MotionFrame>,
}

pub struct Device {
    id: DeviceId,
    identity: DeviceIdentity,
    class: DeviceClass,
    descriptors: DescriptorSet,
    fields: Box<dyn ReportFields + Send>,
    state: ClassState,
    bus: InputEventBus,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("class", &self.class)
            .field("axes", &self.descriptors.axes.len())
            .field("buttons", &self.descriptors.buttons.len())
            .finish()
    }
}

impl Device {
    /// Query the transport and build the device.
    pub fn attach(
        info: &DeviceInfo,
        class: DeviceClass,
        transport: &mut dyn InputTransport,
        store: &dyn CalibrationStore,
        config: DeviceConfig,
        bus: InputEventBus,
    ) -> Device {
        let caps = match transport.query_capabilities(info.id) {
            Ok(caps) => caps,
            Err(e) => {
                warn!(device = %info.id, error = %e, "capability query failed; attaching without descriptors");
                CapabilitySet::default()
            }
        };
        let fields: Box<dyn ReportFields + Send> = if caps.is_empty() {
            Box::new(NoFields)
        } else {
            match transport.report_fields(info.id) {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(device = %info.id, error = %e, "no field extractor; reports will be ignored");
                    Box::new(NoFields)
                }
            }
        };
        Self::from_parts(
            info.id,
            DeviceIdentity::from_info(info),
            class,
            &caps,
            fields,
            store,
            config,
            bus,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: DeviceId,
        identity: DeviceIdentity,
        class: DeviceClass,
        caps: &CapabilitySet,
        fields: Box<dyn ReportFields + Send>,
        store: &dyn CalibrationStore,
        config: DeviceConfig,
        bus: InputEventBus,
    ) -> Device {
        let mut descriptors = caps::resolve(caps, class);
        resolve_calibration(identity.vendor_id, identity.product_id, class, &mut descriptors, store);

        let state = match class {
            DeviceClass::SpaceMotionController => ClassState::SpaceMotion(MotionAggregator::new(
                id,
                identity.product_id,
                &descriptors,
                config,
            )),
            _ => ClassState::Controller(ControllerState::new(
                class.axis_count(),
                descriptors.buttons.len().min(MAX_BUTTONS),
                class.has_hat(),
            )),
        };

        debug!(
            device = %id,
            identity = %identity,
            ?class,
            axes = descriptors.axes.len(),
            mapped = descriptors.mapped_axes().count(),
            buttons = descriptors.buttons.len(),
            "device attached"
        );

        Device {
            id,
            identity,
            class,
            descriptors,
            fields,
            state,
            bus,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    pub fn descriptors(&self) -> &DescriptorSet {
        &self.descriptors
    }

    pub fn class_state(&self) -> &ClassState {
        &self.state
    }

    pub fn bus_mut(&mut self) -> &mut InputEventBus {
        &mut self.bus
    }

    pub fn state(&self) -> DeviceState {
        match &self.state {
            ClassState::Controller(s) => DeviceState {
                class: self.class,
                axes: s.axes.clone(),
                buttons: s.buttons,
                hat: s.hat,
                motion: None,
            },
            ClassState::SpaceMotion(m) => DeviceState {
                class: self.class,
                axes: m.axis_state(),
                buttons: m.buttons(),
                hat: None,
                motion: Some(*m.frame()),
            },
        }
    }

    fn dispatch(&mut self, at_ms: u32, kinds: Vec<InputKind>) {
        if kinds.is_empty() {
            return;
        }
        let events: Vec<InputEvent> = kinds
            .into_iter()
            .map(|kind| InputEvent { device: self.id, at_ms, kind })
            .collect();
        self.bus.emit_all(&events);
    }

    /// Decode one report and notify subscribers.
    pub fn handle_report(&mut self, report: &[u8], ctx: ReportContext, timers: &mut dyn TimerService) {
        let mut out = Vec::new();
        match &mut self.state {
            ClassState::Controller(state) => {
                let summary = decode_report(report, &self.descriptors, &*self.fields, state);
                for (slot, value) in &summary.changed_axes {
                    out.push(InputKind::AxisChanged { slot: *slot, value: *value });
                }
                if summary.hat_changed {
                    if let Some(hat) = state.hat {
                        out.push(InputKind::HatChanged { hat });
                    }
                }
                if !summary.is_empty() {
                    out.push(InputKind::StateUpdated {
                        axes: state.axes.clone(),
                        buttons: state.buttons,
                    });
                }
            }
            ClassState::SpaceMotion(agg) => {
                if let Err(e) = agg.process_report(report, ctx, timers, &mut out) {
                    debug!(device = %self.id, error = %e, "packet ignored");
                }
            }
        }
        self.dispatch(ctx.timestamp_ms, out);
    }

    /// Timer tick for this device.
    pub fn handle_tick(
        &mut self,
        handle: TimerHandle,
        now_ms: u32,
        focus: Focus,
        timers: &mut dyn TimerService,
    ) {
        let mut out = Vec::new();
        if let ClassState::SpaceMotion(agg) = &mut self.state {
            agg.on_timer(handle, now_ms, focus, timers, &mut out);
        }
        self.dispatch(now_ms, out);
    }

    pub fn set_active(&mut self, active: bool) {
        if let ClassState::SpaceMotion(agg) = &mut self.state {
            agg.set_active(active);
        }
    }

    /// Stop this device's timer and consume it.
    pub fn detach(mut self, timers: &mut dyn TimerService) -> DeviceIdentity {
        if let ClassState::SpaceMotion(agg) = &mut self.state {
            agg.shutdown(timers);
        }
        debug!(device = %self.id, "device detached");
        self.identity
    }
}
