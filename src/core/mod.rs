//! Core functionality for the MJ_HT_V1 exporter
//! This module contains the connection lifecycle and the payload decoder

pub mod bluetooth;
pub mod sensor;
pub mod session;

// Re-export commonly used types
pub use bluetooth::BluestDevice;
pub use sensor::{MetricName, SensorMeasurement, SensorReading, decode};
pub use session::{RetryPolicy, SessionController, SessionReport};
