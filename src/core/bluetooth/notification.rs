//! Notification handling for the MJ_HT_V1 sensor
//! This module decodes notification payloads and forwards the readings

use chrono::Utc;
use log::{debug, warn};
use tokio::sync::mpsc;

use crate::core::sensor::{self, SensorMeasurement, SensorReading};

/// Decode-and-forward handler attached to one subscription
#[derive(Clone)]
pub struct NotificationHandler {
    /// Identity of the peripheral the notifications come from
    device_id: String,
    /// Queue drained by the measurement sink
    measurements: mpsc::Sender<SensorMeasurement>,
}

impl NotificationHandler {
    /// Create a new NotificationHandler
    pub fn new(device_id: String, measurements: mpsc::Sender<SensorMeasurement>) -> Self {
        Self {
            device_id,
            measurements,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Process one notification payload.
    ///
    /// Malformed payloads are logged and dropped. A full queue makes this wait,
    /// which holds back the notification task of this subscription.
    pub async fn handle(&self, payload: &[u8]) -> Option<SensorReading> {
        let reading = match sensor::decode(payload) {
            Ok(reading) => reading,
            Err(e) => {
                warn!(
                    "Dropping notification from {}: {} (payload {:02X?})",
                    self.device_id, e, payload
                );
                return None;
            }
        };

        for measurement in reading.into_measurements(&self.device_id) {
            if self.measurements.send(measurement).await.is_err() {
                warn!("Measurement queue closed, dropping reading from {}", self.device_id);
                return None;
            }
        }

        debug!(
            "{} {} temperature={} humidity={}",
            Utc::now(),
            self.device_id,
            reading.temperature,
            reading.humidity
        );
        Some(reading)
    }
}
