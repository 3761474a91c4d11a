//! Capabilities the connection lifecycle needs from a BLE stack
//! The core never talks to a radio directly. [`BleDevice`] is the local
//! adapter (the central) and [`BlePeripheral`] a remote device found by a scan.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::bluetooth::error::BleError;
use crate::core::bluetooth::notification::NotificationHandler;
use crate::core::bluetooth::types::{Advertisement, CharProperties, PowerState};

/// The local adapter
#[async_trait]
pub trait BleDevice: Send + Sync + 'static {
    type Peripheral: BlePeripheral;

    /// Current power state of the radio
    async fn power_state(&self) -> Result<PowerState, BleError>;

    /// Stream of power state changes, starting from the next change
    async fn power_events(&self) -> Result<mpsc::Receiver<PowerState>, BleError>;

    /// Starts scanning for all advertisers.
    /// Advertisements are delivered until [`BleDevice::stop_scan`] is called.
    async fn start_scan(&self) -> Result<mpsc::Receiver<Advertisement<Self::Peripheral>>, BleError>;

    /// Stops an active scan. Stopping an idle adapter is not an error.
    async fn stop_scan(&self) -> Result<(), BleError>;

    /// Connects to a peripheral
    async fn connect(&self, peripheral: &Self::Peripheral) -> Result<(), BleError>;

    /// Disconnects from a peripheral, or cancels a pending connect.
    /// Also ends every notification subscription of that peripheral.
    async fn cancel_connection(&self, peripheral: &Self::Peripheral) -> Result<(), BleError>;
}

/// A remote device and its GATT hierarchy
#[async_trait]
pub trait BlePeripheral: Clone + Send + Sync + 'static {
    type Service: Send + Sync;
    type Characteristic: Send + Sync;

    /// Identity used to label measurements
    fn id(&self) -> String;

    /// Display name
    fn name(&self) -> String;

    /// Requests a larger link MTU
    async fn set_mtu(&self, mtu: u16) -> Result<(), BleError>;

    async fn discover_services(&self) -> Result<Vec<Self::Service>, BleError>;

    async fn discover_characteristics(
        &self,
        service: &Self::Service,
    ) -> Result<Vec<Self::Characteristic>, BleError>;

    async fn characteristic_properties(
        &self,
        characteristic: &Self::Characteristic,
    ) -> Result<CharProperties, BleError>;

    /// Discovers the descriptors of a characteristic, returning how many were found
    async fn discover_descriptors(
        &self,
        characteristic: &Self::Characteristic,
    ) -> Result<usize, BleError>;

    /// Subscribes to notifications or indications.
    /// Every received payload is passed to `handler` until the connection ends.
    async fn subscribe(
        &self,
        characteristic: &Self::Characteristic,
        handler: NotificationHandler,
    ) -> Result<(), BleError>;
}
