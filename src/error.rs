//! Error types.
//!
//! Each layer owns a small `thiserror` enum:
//! - [`TransportError`]: enumeration, capability queries and raw reads.
//! - [`ReportError`]: a single report could not be decoded (or one field of it).
//! - [`ConfigError`]: TOML configuration or calibration files.
//!
//! [`Error`] wraps all three for callers that do not care which layer failed.
//!
//! Per-report failures never escalate: the decoder logs them at `debug` level and
//! leaves the previous state untouched. Only attach/configuration paths return
//! errors to the host.

use thiserror::Error;

/// Failures reported by an [`InputTransport`](crate::transport::InputTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport does not know the given device id.
    #[error("unknown device {0}")]
    UnknownDevice(u64),

    /// The platform refused a capability query.
    #[error("capability query failed: {0}")]
    Capabilities(String),

    /// The device could not be opened or read.
    #[error("device i/o failed: {0}")]
    Io(String),

    /// The operation is not available on this platform/backend.
    #[error("not supported by this transport: {0}")]
    Unsupported(&'static str),

    #[cfg(feature = "hid")]
    #[error(transparent)]
    Hid(#[from] hidapi::HidError),
}

/// A report (or one field inside it) could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// The report is empty.
    #[error("empty report")]
    Empty,

    /// The report is shorter than the field being read.
    #[error("report too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    /// The report id prefix did not match the field's report.
    #[error("report id mismatch: expected {expected}, got {actual:?}")]
    ReportIdMismatch { expected: u8, actual: Option<u8> },

    /// No field layout is known for this data index.
    #[error("no field for data index {0}")]
    UnknownDataIndex(u16),

    /// The transport provided no field layout at all.
    #[error("no report field layout available")]
    NoLayout,

    /// A space mouse packet carried an unknown tag byte.
    #[error("unknown packet tag {0:#04x}")]
    UnknownTag(u8),

    /// The platform parser rejected the report (raw status code).
    #[error("platform parser status {0:#010x}")]
    Status(i32),
}

/// Configuration and calibration file failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

/// Umbrella error for host-facing entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to serialize device report: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
