//! Transports for `hidmotion`.
//!
//! Implementations of [`InputTransport`](crate::transport::InputTransport).
//!
//! # Feature flags
//! - **`hid`**: enables [`hid::HidapiTransport`] (enumeration and reads via `hidapi`).
//!
//! On Windows the [`windows`] module adds HIDP capability queries and the
//! registry calibration store. [`virtual_input::MemoryTransport`] is always
//! available and needs no hardware.

pub mod virtual_input;

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;

pub use virtual_input::MemoryTransport;
