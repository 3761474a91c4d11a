//! Connection lifecycle for one sensor
//! This module drives a peripheral from connect through GATT setup and
//! the dwell interval back to disconnect.

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::core::bluetooth::device::{BleDevice, BlePeripheral};
use crate::core::bluetooth::gatt::GattWalker;
use crate::core::bluetooth::types::WalkSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Configuring,
    /// Holding the link open while notifications arrive
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Configuring => "configuring",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

/// How a connection cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Connected and walked the GATT tree
    Completed(WalkSummary),
    /// Connected, but the GATT tree could not be read
    ConfigFailed,
    /// The peripheral could not be reached
    ConnectFailed,
}

/// Connection state machine for a single peripheral at a time
pub struct ConnectionStateMachine<D: BleDevice> {
    device: Arc<D>,
    walker: GattWalker,
    /// Receives the display name of every peripheral that went back to idle
    disconnects: mpsc::Sender<String>,
    state: ConnectionState,
}

impl<D: BleDevice> ConnectionStateMachine<D> {
    pub fn new(device: Arc<D>, walker: GattWalker, disconnects: mpsc::Sender<String>) -> Self {
        Self {
            device,
            walker,
            disconnects,
            state: ConnectionState::Idle,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Run one full connection cycle.
    ///
    /// Whatever fails along the way, exactly one `cancel_connection` is issued
    /// and the peripheral name is sent on the disconnect channel before returning.
    pub async fn run(&mut self, peripheral: D::Peripheral) -> CycleOutcome {
        let name = peripheral.name();

        self.transition(ConnectionState::Connecting);
        if let Err(e) = self.device.stop_scan().await {
            warn!("Failed to stop scanning: {}", e);
        }

        info!("Initiating connection to {} ({})...", name, peripheral.id());
        let outcome = match self.device.connect(&peripheral).await {
            Ok(()) => {
                info!("Connected to {}", name);
                self.configure(&peripheral).await
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", name, e);
                CycleOutcome::ConnectFailed
            }
        };

        self.transition(ConnectionState::Disconnecting);
        if let Err(e) = self.device.cancel_connection(&peripheral).await {
            warn!("Failed to disconnect from {}: {}", name, e);
        }

        self.transition(ConnectionState::Idle);
        info!("Disconnected: '{}'", name);
        if self.disconnects.send(name).await.is_err() {
            warn!("Disconnect event channel closed");
        }

        outcome
    }

    async fn configure(&mut self, peripheral: &D::Peripheral) -> CycleOutcome {
        self.transition(ConnectionState::Configuring);
        let summary = match self.walker.configure(peripheral).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Failed to configure {}: {}", peripheral.name(), e);
                return CycleOutcome::ConfigFailed;
            }
        };

        self.transition(ConnectionState::Connected);
        let dwell = self.walker.dwell();
        debug!("Holding connection for {:?}", dwell);
        tokio::time::sleep(dwell).await;

        CycleOutcome::Completed(summary)
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!("Connection state {} -> {}", self.state, next);
        self.state = next;
    }
}
