//! Prometheus side of the exporter
//! Decoded measurements end up in a single gauge family labelled by sensor
//! and characteristic, served over HTTP at `/metrics`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info};
use prometheus_exporter::Exporter;
use prometheus_exporter::prometheus::{self, GaugeVec, Opts, Registry};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::bluetooth::METRIC_FAMILY;
use crate::core::sensor::{MetricName, SensorMeasurement};

/// Receives every decoded measurement exactly once
pub trait MeasurementSink: Send + Sync {
    fn publish(&self, measurement: &SensorMeasurement);
}

/// Gauge family `sensor_measurement{sensor_id, characteristic}`, last write wins
pub struct PrometheusSink {
    gauges: GaugeVec,
}

impl PrometheusSink {
    /// Creates the gauge family without registering it anywhere
    pub fn new() -> Result<Self, prometheus::Error> {
        let gauges = GaugeVec::new(
            Opts::new(METRIC_FAMILY, "Latest reading reported by a BLE sensor"),
            &["sensor_id", "characteristic"],
        )?;
        Ok(Self { gauges })
    }

    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.gauges.clone()))
    }

    /// Current gauge value, 0.0 if never set
    pub fn value(&self, device_id: &str, metric: MetricName) -> f64 {
        self.gauges
            .with_label_values(&[device_id, metric.as_str()])
            .get()
    }
}

impl MeasurementSink for PrometheusSink {
    fn publish(&self, measurement: &SensorMeasurement) {
        self.gauges
            .with_label_values(&[measurement.device_id.as_str(), measurement.metric.as_str()])
            .set(measurement.value);
    }
}

/// Consumer side of the measurement queue
pub struct MeasurementPump;

impl MeasurementPump {
    /// Publishes everything received until every sender is dropped.
    /// The task resolves to the number of measurements published.
    pub fn spawn(mut measurements: mpsc::Receiver<SensorMeasurement>, sink: Arc<dyn MeasurementSink>) -> JoinHandle<usize> {
        tokio::spawn(async move {
            let mut published = 0;
            while let Some(measurement) = measurements.recv().await {
                debug!(
                    "Publishing {}={} for {}",
                    measurement.metric, measurement.value, measurement.device_id
                );
                sink.publish(&measurement);
                published += 1;
            }
            info!("Measurement queue closed after {} measurements", published);
            published
        })
    }
}

/// Registers the sink in the default registry and serves it on `address`.
pub fn start_exporter(address: SocketAddr, sink: &PrometheusSink) -> Result<Exporter> {
    sink.register(prometheus::default_registry())
        .context("failed to register sensor gauges")?;
    let exporter = prometheus_exporter::start(address)
        .with_context(|| format!("failed to start metrics endpoint on {}", address))?;
    info!("Serving metrics on http://{}/metrics", address);
    Ok(exporter)
}
