//! Defines shared data structures for the Bluetooth module.

use std::collections::HashMap;

use uuid::Uuid;

/// Power state of the local radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Unknown,
}

/// A received advertisement together with the peripheral that sent it
#[derive(Debug, Clone)]
pub struct Advertisement<P> {
    /// The advertising peripheral
    pub peripheral: P,
    /// The advertised local name, if any
    pub local_name: Option<String>,
    /// The signal strength (RSSI) of the advertisement
    pub rssi: Option<i16>,
    /// Advertised TX power level
    pub tx_power_level: Option<i16>,
    /// Manufacturer specific data (company id, payload)
    pub manufacturer_data: Option<(u16, Vec<u8>)>,
    /// Service data keyed by service UUID
    pub service_data: HashMap<Uuid, Vec<u8>>,
}

/// Characteristic property bits the GATT walk cares about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharProperties {
    pub read: bool,
    pub notify: bool,
    pub indicate: bool,
}

impl CharProperties {
    /// Returns true if the characteristic pushes values after subscribing
    pub fn is_subscribable(&self) -> bool {
        self.notify || self.indicate
    }
}

/// What a GATT walk did on one connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Services discovered
    pub services: usize,
    /// Characteristics discovered across all services
    pub characteristics: usize,
    /// Characteristics successfully subscribed
    pub subscribed: usize,
    /// Services or characteristics skipped after a failure
    pub skipped: usize,
}
