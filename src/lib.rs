//! Capability-driven decoding of HID game controllers and 6-DoF space mice.
//!
//! `hidmotion` turns raw HID input reports into normalized axis, button, hat and
//! motion values. Each device's layout is taken from what the platform reports
//! about it ([`CapabilitySet`]), then refined with calibration data
//! ([`CalibrationStore`]) before any report is decoded.
//!
//! - Joysticks, gamepads and multi-axis controllers decode through [`decode_report`].
//! - Space mice accumulate translation/rotation packets in a [`MotionAggregator`]
//!   that emits scaled motion frames and key transitions.
//!
//! Hosts usually drive everything through a [`Manager`] over an [`InputTransport`].
//! [`backends::virtual_input::MemoryTransport`] is always available; the
//! `hid` feature adds a `hidapi`-based transport.

pub mod backends;
pub mod calibration;
pub mod caps;
pub mod config;
pub mod decoder;
pub mod device;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod fields;
pub mod logger;
pub mod manager;
pub mod metadata;
pub mod motion;
pub mod normalize;
pub mod snapshot;
pub mod timer;
pub mod transport;
pub mod usage;
pub mod virtual_keys;

pub use calibration::{
    resolve_calibration, CalibrationRecord, CalibrationStore, MemoryCalibrationStore,
    NoCalibration, UsageMapping,
};
pub use caps::{
    AxisDescriptor, ButtonCap, ButtonDescriptor, ButtonGroup, CapabilitySet, DescriptorSet,
    UsageRange, UsageSpec, ValueCap,
};
pub use config::{Config, DeviceConfig, Speed};
pub use decoder::{decode_report, AxisState, ButtonState, ControllerState, HatDirection};
pub use device::{Device, DeviceClass, DeviceState};
pub use error::{ConfigError, Error, ReportError, Result, TransportError};
pub use event::{InputEvent, InputKind};
pub use eventbus::{EventFilter, EventLog, InputEventBus, InputListener};
pub use fields::{BitField, BitLayout, ReportFields};
pub use logger::TracingListener;
pub use manager::Manager;
pub use metadata::DeviceIdentity;
pub use motion::{Focus, MotionAggregator, MotionFrame, ReportContext};
pub use normalize::normalize;
pub use snapshot::Snapshot;
pub use timer::{TimerHandle, TimerQueue, TimerService};
pub use transport::{DeviceId, DeviceInfo, InputTransport};
pub use usage::AxisSlot;
pub use virtual_keys::{VirtualKey, VirtualKeyTable};
