#![cfg(target_os = "windows")]

//! Windows platform support.
//!
//! - [`hidp`]: capability queries and report field extraction through the HID
//!   parser (`HidP_*`), used by the `hid` transport.
//! - [`registry`]: DirectInput calibration and OEM axis mapping read from the
//!   current user's registry hive.
//!
//! Hosts normally only touch [`RegistryCalibrationStore`], passing it to
//! [`Manager::with_calibration`](crate::manager::Manager::with_calibration).

pub mod hidp;
pub mod registry;

pub use hidp::HidpDevice;
pub use registry::RegistryCalibrationStore;
