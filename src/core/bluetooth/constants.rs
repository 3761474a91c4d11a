//! Constants used throughout the application
//! This module contains the default values for the sensor, the connection
//! lifecycle and the exporter.

use std::time::Duration;

/// Advertised local name of the Xiaomi Mijia thermometer/hygrometer
pub const SENSOR_LOCAL_NAME: &str = "MJ_HT_V1";

/// MTU requested after connecting
pub const DEFAULT_MTU: u16 = 500;

/// How long a configured connection is held open, in seconds
pub const DEFAULT_DWELL_SECS: u64 = 5;

/// Number of scan/connect/disconnect cycles per run
pub const DEFAULT_MAX_CYCLES: u32 = 10;

/// Pause between two cycles, in seconds
pub const DEFAULT_BACKOFF_SECS: u64 = 5;

/// Pause after the last cycle before the channels are closed, in seconds
pub const DEFAULT_DRAIN_SECS: u64 = 5;

/// Capacity of the measurement queue between notifications and the sink
pub const DEFAULT_MEASUREMENT_BUFFER: usize = 64;

/// Pause before scanning again after the platform ended a scan on its own
pub const SCAN_RESTART_DELAY: Duration = Duration::from_millis(500);

/// Capacity of the scan and power event queues in the platform layer
pub const EVENT_QUEUE_CAPACITY: usize = 32;

/// Address the `/metrics` endpoint listens on
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:80";

/// Gauge family holding every reading
pub const METRIC_FAMILY: &str = "sensor_measurement";
