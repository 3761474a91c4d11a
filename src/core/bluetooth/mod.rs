//! Bluetooth functionality for the MJ_HT_V1 exporter
//! This module handles scanning for the sensor, connecting to it, walking its
//! GATT tree and receiving its notifications.

mod connection;
mod constants;
mod device;
pub mod error;
mod gatt;
#[cfg(test)]
pub(crate) mod mock;
mod notification;
mod platform;
mod scanner;
pub mod types;

// Re-export types that should be publicly accessible
pub use connection::{ConnectionState, ConnectionStateMachine, CycleOutcome};
pub use constants::*; // Re-export all constants
pub use device::{BleDevice, BlePeripheral};
pub use error::{BleError, ConfigError};
pub use gatt::GattWalker;
pub use notification::NotificationHandler;
pub use platform::{BluestDevice, BluestPeripheral};
pub use scanner::{ScanDispatcher, is_target};
pub use types::{Advertisement, CharProperties, PowerState, WalkSummary};
