use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::constants::SCAN_RESTART_DELAY;
use crate::core::bluetooth::connection::{ConnectionStateMachine, CycleOutcome};
use crate::core::bluetooth::device::{BleDevice, BlePeripheral};
use crate::core::bluetooth::error::BleError;
use crate::core::bluetooth::types::{Advertisement, PowerState};

/// Follows the radio power state, scans while powered and hands the first
/// matching peripheral to the connection state machine.
pub struct ScanDispatcher<D: BleDevice> {
    device: Arc<D>,
    local_name: String,
    machine: ConnectionStateMachine<D>,
}

impl<D: BleDevice> ScanDispatcher<D> {
    pub fn new(device: Arc<D>, local_name: impl Into<String>, machine: ConnectionStateMachine<D>) -> Self {
        Self {
            device,
            local_name: local_name.into(),
            machine,
        }
    }

    /// Returns true if the advertised name is the target sensor
    pub fn matches(&self, local_name: Option<&str>) -> bool {
        is_target(local_name, &self.local_name)
    }

    /// Scan until the target sensor is found and its connection cycle is over.
    ///
    /// Returns `Ok(None)` when cancelled before a match. Cancellation is only
    /// observed while scanning or waiting for power; a connection in progress
    /// always runs to its disconnect.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<Option<CycleOutcome>, BleError> {
        let mut power_events = Some(self.device.power_events().await?);
        let mut state = self.device.power_state().await?;
        info!("Adapter state: {:?}", state);

        loop {
            if state != PowerState::PoweredOn {
                self.stop_scan().await;
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(None),
                    next = next_power_event(&mut power_events) => {
                        state = next;
                        info!("Adapter state: {:?}", state);
                        continue;
                    }
                }
            }

            info!("Scanning...");
            let mut advertisements = self.device.start_scan().await?;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        self.stop_scan().await;
                        return Ok(None);
                    }
                    next = next_power_event(&mut power_events) => {
                        state = next;
                        info!("Adapter state: {:?}", state);
                        if state != PowerState::PoweredOn {
                            break;
                        }
                    }
                    advertisement = advertisements.recv() => match advertisement {
                        Some(advertisement) => {
                            if !self.matches(advertisement.local_name.as_deref()) {
                                continue;
                            }
                            log_advertisement(&advertisement);
                            let outcome = self.machine.run(advertisement.peripheral).await;
                            return Ok(Some(outcome));
                        }
                        None => {
                            warn!("Scan stream ended, checking the adapter");
                            self.stop_scan().await;
                            tokio::select! {
                                _ = cancel.cancelled() => return Ok(None),
                                _ = sleep(SCAN_RESTART_DELAY) => {}
                            }
                            state = self.device.power_state().await?;
                            info!("Adapter state: {:?}", state);
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn stop_scan(&self) {
        if let Err(e) = self.device.stop_scan().await {
            warn!("Failed to stop scanning: {}", e);
        }
    }
}

/// Case-insensitive exact match of an advertised name
pub fn is_target(local_name: Option<&str>, target: &str) -> bool {
    local_name.is_some_and(|name| name.eq_ignore_ascii_case(target))
}

/// Waits for the next power state change. Pends forever once the source is gone.
async fn next_power_event(events: &mut Option<mpsc::Receiver<PowerState>>) -> PowerState {
    if let Some(rx) = events.as_mut() {
        if let Some(state) = rx.recv().await {
            return state;
        }
        debug!("Power state events ended");
        *events = None;
    }
    std::future::pending().await
}

fn log_advertisement<P: BlePeripheral>(advertisement: &Advertisement<P>) {
    let peripheral = &advertisement.peripheral;
    info!(
        "Peripheral ID:{}, NAME:({}), RSSI: {:?}",
        peripheral.id(),
        peripheral.name(),
        advertisement.rssi
    );
    info!("  Local Name        = {:?}", advertisement.local_name);
    info!("  TX Power Level    = {:?}", advertisement.tx_power_level);
    info!("  Manufacturer Data = {:02X?}", advertisement.manufacturer_data);
    info!("  Service Data      = {:02X?}", advertisement.service_data);
}
