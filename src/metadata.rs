//! Device identity.
//!
//! [`DeviceIdentity`] is captured once at attach from the transport's
//! [`DeviceInfo`] and never changes afterwards. Names are best effort; when
//! the transport reports none, a `VID_xxxx&PID_xxxx` label is used.
//!
//! ## Persistence notes
//! - `vendor_id`/`product_id` key calibration and configuration lookups.
//! - `path` is platform-specific and may change across ports and reconnects;
//!   treat it as diagnostic.

use serde::{Deserialize, Serialize};

use crate::transport::DeviceInfo;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub vendor_name: String,
    pub device_name: String,
    pub serial_number: Option<String>,
    pub path: Option<String>,
}

impl DeviceIdentity {
    pub fn from_info(info: &DeviceInfo) -> Self {
        let fallback = format!("VID_{:04X}&PID_{:04X}", info.vendor_id, info.product_id);
        Self {
            vendor_id: info.vendor_id,
            product_id: info.product_id,
            vendor_name: non_empty(info.vendor_name.as_deref()).unwrap_or_default(),
            device_name: non_empty(info.product_name.as_deref()).unwrap_or(fallback),
            serial_number: non_empty(info.serial_number.as_deref()),
            path: info.path.clone(),
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.vendor_name.is_empty() {
            write!(f, "{} [{:04x}:{:04x}]", self.device_name, self.vendor_id, self.product_id)
        } else {
            write!(
                f,
                "{} {} [{:04x}:{:04x}]",
                self.vendor_name, self.device_name, self.vendor_id, self.product_id
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_fall_back_to_ids() {
        let info = DeviceInfo {
            vendor_id: 0x046d,
            product_id: 0xc626,
            product_name: Some("  ".into()),
            ..Default::default()
        };
        let id = DeviceIdentity::from_info(&info);
        assert_eq!(id.device_name, "VID_046D&PID_C626");
        assert_eq!(id.to_string(), "VID_046D&PID_C626 [046d:c626]");

        let info = DeviceInfo {
            vendor_name: Some("3Dconnexion".into()),
            product_name: Some("SpaceNavigator".into()),
            ..info
        };
        assert_eq!(
            DeviceIdentity::from_info(&info).to_string(),
            "3Dconnexion SpaceNavigator [046d:c626]"
        );
    }
}
