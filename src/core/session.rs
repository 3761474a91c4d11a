//! Session controller
//! Runs a bounded number of scan -> connect -> disconnect cycles and owns the
//! channels shared by the lifecycle components.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::config::SensorConfig;
use crate::core::bluetooth::{BleDevice, ConnectionStateMachine, CycleOutcome, GattWalker, ScanDispatcher};
use crate::metrics::{MeasurementPump, MeasurementSink};

/// How many cycles to run and how long to pause around them
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_cycles: u32,
    /// Pause between cycles
    pub backoff: Duration,
    /// Pause after the last cycle, before the channels are closed
    pub drain: Duration,
    /// Upper bound on a cycle that never sees its peripheral
    pub scan_timeout: Option<Duration>,
    /// Capacity of the measurement queue
    pub measurement_buffer: usize,
}

/// Totals over a whole session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub cycles: u32,
    pub disconnects: u32,
    pub measurements: usize,
}

pub struct SessionController<D: BleDevice> {
    device: Arc<D>,
    sensor: SensorConfig,
    policy: RetryPolicy,
}

impl<D: BleDevice> SessionController<D> {
    pub fn new(device: Arc<D>, sensor: SensorConfig, policy: RetryPolicy) -> Self {
        Self {
            device,
            sensor,
            policy,
        }
    }

    /// Runs every cycle, then drains and closes the measurement queue.
    pub async fn run(self, sink: Arc<dyn MeasurementSink>) -> Result<SessionReport> {
        let (measurement_tx, measurement_rx) = mpsc::channel(self.policy.measurement_buffer.max(1));
        let (disconnect_tx, mut disconnect_rx) = mpsc::channel::<String>(4);
        let mut pump = MeasurementPump::spawn(measurement_rx, sink);
        let mut report = SessionReport::default();

        for cycle in 1..=self.policy.max_cycles {
            info!("Starting cycle {}/{}", cycle, self.policy.max_cycles);
            report.cycles += 1;

            let walker = GattWalker::new(self.sensor.mtu, self.sensor.dwell(), measurement_tx.clone());
            let machine = ConnectionStateMachine::new(self.device.clone(), walker, disconnect_tx.clone());
            let dispatcher = ScanDispatcher::new(self.device.clone(), self.sensor.local_name.clone(), machine);
            let cancel = CancellationToken::new();
            let mut task = tokio::spawn(dispatcher.run(cancel.clone()));

            let mut finished = None;
            let mut disconnected = tokio::select! {
                name = disconnect_rx.recv() => name,
                result = &mut task => {
                    finished = Some(result);
                    None
                }
                _ = scan_window(self.policy.scan_timeout) => {
                    warn!("No disconnect event within {:?}, ending cycle {}", self.policy.scan_timeout, cycle);
                    None
                }
            };

            // A connection in progress still runs to its disconnect before the task ends.
            cancel.cancel();
            let result = match finished {
                Some(result) => result,
                None => task.await,
            };
            match result {
                Ok(Ok(Some(CycleOutcome::ConnectFailed))) => warn!("Cycle {} ended without a connection", cycle),
                Ok(Ok(Some(outcome))) => debug!("Cycle {} ended: {:?}", cycle, outcome),
                Ok(Ok(None)) => info!("Cycle {} ended before {} was found", cycle, self.sensor.local_name),
                Ok(Err(e)) => error!("Cycle {} failed: {}", cycle, e),
                Err(e) => error!("Scan task for cycle {} failed: {}", cycle, e),
            }

            if disconnected.is_none() {
                disconnected = disconnect_rx.try_recv().ok();
            }
            if let Some(name) = disconnected {
                info!("Device {} is disconnected", name);
                report.disconnects += 1;
            }

            if cycle < self.policy.max_cycles {
                info!("Sleep for {:?}", self.policy.backoff);
                sleep(self.policy.backoff).await;
            }
        }

        info!("Sleep for {:?} before shutdown", self.policy.drain);
        sleep(self.policy.drain).await;

        // Producers stopped with their connections; closing the queue ends the pump.
        drop(measurement_tx);
        drop(disconnect_tx);
        match timeout(self.policy.drain, &mut pump).await {
            Ok(joined) => report.measurements = joined.context("measurement pump panicked")?,
            Err(_) => {
                warn!("Measurement queue still has producers, aborting the pump");
                pump.abort();
            }
        }

        info!(
            "Done: {} cycles, {} disconnects, {} measurements",
            report.cycles, report.disconnects, report.measurements
        );
        Ok(report)
    }
}

async fn scan_window(limit: Option<Duration>) {
    match limit {
        Some(limit) => sleep(limit).await,
        None => std::future::pending().await,
    }
}
