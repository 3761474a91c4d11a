//! MJ_HT_V1 exporter library
//! Reads a Xiaomi Mijia BLE thermometer and republishes its readings as
//! Prometheus gauges.

// Module declarations
pub mod config;
pub mod core;
pub mod logging;
pub mod metrics;
