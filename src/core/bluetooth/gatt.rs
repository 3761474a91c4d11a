//! GATT walk for a freshly connected sensor
//! Every step after the MTU request is best effort: a failure skips the
//! affected service or characteristic and the walk carries on.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::core::bluetooth::device::BlePeripheral;
use crate::core::bluetooth::error::ConfigError;
use crate::core::bluetooth::notification::NotificationHandler;
use crate::core::bluetooth::types::WalkSummary;
use crate::core::sensor::SensorMeasurement;

/// Discovers the GATT hierarchy and subscribes to everything that notifies
#[derive(Clone)]
pub struct GattWalker {
    mtu: u16,
    dwell: Duration,
    measurements: mpsc::Sender<SensorMeasurement>,
}

impl GattWalker {
    pub fn new(mtu: u16, dwell: Duration, measurements: mpsc::Sender<SensorMeasurement>) -> Self {
        Self {
            mtu,
            dwell,
            measurements,
        }
    }

    /// How long a configured connection should be held open
    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    /// Walk the peripheral and set up notifications.
    ///
    /// Fails only when the service list can't be read at all.
    pub async fn configure<P: BlePeripheral>(&self, peripheral: &P) -> Result<WalkSummary, ConfigError> {
        let device_id = peripheral.id();
        let mut summary = WalkSummary::default();

        if let Err(e) = peripheral.set_mtu(self.mtu).await {
            warn!("Failed to set MTU {} on {}: {}", self.mtu, device_id, e);
        }

        let services = peripheral
            .discover_services()
            .await
            .map_err(ConfigError::Services)?;
        summary.services = services.len();
        info!("Discovered {} services on {}", services.len(), device_id);

        for service in &services {
            let characteristics = match peripheral.discover_characteristics(service).await {
                Ok(characteristics) => characteristics,
                Err(e) => {
                    warn!("Failed to discover characteristics on {}: {}", device_id, e);
                    summary.skipped += 1;
                    continue;
                }
            };
            summary.characteristics += characteristics.len();

            for characteristic in &characteristics {
                let properties = match peripheral.characteristic_properties(characteristic).await {
                    Ok(properties) => properties,
                    Err(e) => {
                        warn!("Failed to read characteristic properties on {}: {}", device_id, e);
                        summary.skipped += 1;
                        continue;
                    }
                };

                match peripheral.discover_descriptors(characteristic).await {
                    Ok(count) => debug!("Discovered {} descriptors on {}", count, device_id),
                    Err(e) => {
                        warn!("Failed to discover descriptors on {}: {}", device_id, e);
                        summary.skipped += 1;
                        continue;
                    }
                }

                if !properties.is_subscribable() {
                    continue;
                }

                let handler = NotificationHandler::new(device_id.clone(), self.measurements.clone());
                match peripheral.subscribe(characteristic, handler).await {
                    Ok(()) => summary.subscribed += 1,
                    Err(e) => {
                        warn!("Failed to subscribe characteristic on {}: {}", device_id, e);
                        summary.skipped += 1;
                    }
                }
            }
        }

        info!(
            "GATT walk on {} done: {} characteristics, {} subscribed, {} skipped",
            device_id, summary.characteristics, summary.subscribed, summary.skipped
        );
        Ok(summary)
    }
}
