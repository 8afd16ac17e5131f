//! Per-device configuration.
//!
//! [`DeviceConfig`] carries the space mouse filters and dispatch mode. A
//! [`Config`] adds per-VID/PID overrides on top of a default and can be loaded
//! from TOML:
//!
//! ```toml
//! [default]
//! only_foreground = true
//! speed = "mid"
//!
//! [[devices]]
//! vendor_id = 0x046d
//! product_id = 0xc626
//! [devices.config]
//! polling_enabled = true
//! polling_period_ms = 16
//! speed = "high"
//! ```
//!
//! Omitted keys take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Sensitivity preset for 6-DoF motion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    Low,
    #[default]
    Mid,
    High,
}

impl Speed {
    #[inline]
    pub fn factor(self) -> f32 {
        match self {
            Speed::Low => 0.25,
            Speed::Mid => 1.0,
            Speed::High => 4.0,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_polling_period() -> u32 {
    DeviceConfig::DEFAULT_POLLING_PERIOD_MS
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Discard motion while the host application is in the background.
    #[serde(default)]
    pub only_foreground: bool,
    #[serde(default)]
    pub speed: Speed,
    #[serde(default = "default_true")]
    pub pan_zoom_enabled: bool,
    #[serde(default = "default_true")]
    pub rotate_enabled: bool,
    /// Recompute motion on a timer instead of only when packets arrive.
    #[serde(default)]
    pub polling_enabled: bool,
    #[serde(default = "default_polling_period")]
    pub polling_period_ms: u32,
}

impl DeviceConfig {
    pub const DEFAULT_POLLING_PERIOD_MS: u32 = 20;

    fn validate(&self) -> Result<(), ConfigError> {
        if self.polling_period_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "polling_period_ms".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            only_foreground: false,
            speed: Speed::Mid,
            pan_zoom_enabled: true,
            rotate_enabled: true,
            polling_enabled: false,
            polling_period_ms: Self::DEFAULT_POLLING_PERIOD_MS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOverride {
    pub vendor_id: u16,
    pub product_id: u16,
    #[serde(default)]
    pub config: DeviceConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub default: DeviceConfig,
    #[serde(default)]
    pub devices: Vec<DeviceOverride>,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.default.validate()?;
        for d in &config.devices {
            d.config.validate()?;
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Configuration for a device; the first matching override wins.
    pub fn for_device(&self, vendor_id: u16, product_id: u16) -> DeviceConfig {
        self.devices
            .iter()
            .find(|d| d.vendor_id == vendor_id && d.product_id == product_id)
            .map(|d| d.config.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = DeviceConfig::default();
        assert!(!c.only_foreground);
        assert_eq!(c.speed, Speed::Mid);
        assert!(c.pan_zoom_enabled && c.rotate_enabled);
        assert!(!c.polling_enabled);
        assert_eq!(c.polling_period_ms, 20);
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn overrides_by_vid_pid() {
        let config = Config::from_toml_str(
            r#"
            [default]
            only_foreground = true

            [[devices]]
            vendor_id = 0x046d
            product_id = 0xc626
            [devices.config]
            polling_enabled = true
            polling_period_ms = 16
            speed = "high"
            "#,
        )
        .unwrap();
        let nav = config.for_device(0x046d, 0xc626);
        assert!(nav.polling_enabled);
        assert_eq!(nav.polling_period_ms, 16);
        assert_eq!(nav.speed.factor(), 4.0);
        // Overrides replace the whole device config.
        assert!(!nav.only_foreground);
        assert!(config.for_device(0x046d, 0xc627).only_foreground);
    }

    #[test]
    fn rejects_zero_period_and_bad_speed() {
        assert!(matches!(
            Config::from_toml_str("[default]\npolling_period_ms = 0\n"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            Config::from_toml_str("[default]\nspeed = \"turbo\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
