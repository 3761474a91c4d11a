//! Error types for the Bluetooth module.

use thiserror::Error;

/// Failures reported by the BLE capability provider.
///
/// Only [`BleError::Adapter`] is fatal, and only at startup. Everything else
/// is logged and the connection lifecycle moves on to the next unit of work.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BleError {
    /// The radio is missing or could not be opened.
    #[error("bluetooth adapter unavailable: {0}")]
    Adapter(String),

    /// Service, characteristic or descriptor enumeration failed.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// The peripheral could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    /// A characteristic could not be subscribed.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// The platform stack has no way to perform the operation.
    #[error("{0} is not supported by the platform stack")]
    Unsupported(&'static str),

    /// The peripheral went away while an operation was in flight.
    #[error("peripheral disconnected")]
    Disconnected,
}

/// The GATT walk could not get started.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("service discovery failed: {0}")]
    Services(#[source] BleError),
}
