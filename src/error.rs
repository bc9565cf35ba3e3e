//! Shared error vocabulary for the alarm core.
//!
//! Mirrors the policy table in the specification: decoder/socket errors are
//! always recoverable (drive a reconnect), configuration errors are fatal
//! only at startup, and notification errors drive the retry/drop decision in
//! the notification worker.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("failed to connect to {0}")]
    Connect(#[source] std::io::Error),

    #[error("socket I/O error")]
    Io(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sensor name {0:?} is empty")]
    EmptySensorName(String),

    #[error("duplicate sensor name {0:?}")]
    DuplicateSensorName(String),

    #[error("scalar sensor {sensor:?} has low_limit ({low}) >= high_limit ({high})")]
    InvalidLimits {
        sensor: String,
        low: f64,
        high: f64,
    },

    #[error("temp_diff pair references unknown scalar sensor {0:?}")]
    UnknownTempDiffSensor(String),

    #[error("ftir_peak_shift references unknown spectral channel {0:?}")]
    UnknownSpectralChannel(String),

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport error delivering webhook")]
    Transport(#[source] reqwest::Error),

    #[error("webhook returned client error status {0}")]
    ClientError(u16),

    #[error("webhook returned server error status {0}")]
    ServerError(u16),
}
