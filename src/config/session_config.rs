use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::RetryPolicy;
use crate::core::bluetooth::{
    DEFAULT_BACKOFF_SECS, DEFAULT_DRAIN_SECS, DEFAULT_MAX_CYCLES, DEFAULT_MEASUREMENT_BUFFER,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of scan/connect/disconnect cycles before exiting
    pub max_cycles: u32,

    /// Seconds to wait between cycles
    pub backoff_secs: u64,

    /// Seconds to wait after the last cycle before shutting down
    pub drain_secs: u64,

    /// Gives up on a cycle that hasn't seen the sensor after this many seconds.
    /// Unset means a cycle scans until the sensor shows up.
    pub scan_timeout_secs: Option<u64>,

    /// Capacity of the queue between notifications and the metrics registry
    pub measurement_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_cycles: DEFAULT_MAX_CYCLES,
            backoff_secs: DEFAULT_BACKOFF_SECS,
            drain_secs: DEFAULT_DRAIN_SECS,
            scan_timeout_secs: None,
            measurement_buffer: DEFAULT_MEASUREMENT_BUFFER,
        }
    }
}

impl SessionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_cycles: self.max_cycles,
            backoff: Duration::from_secs(self.backoff_secs),
            drain: Duration::from_secs(self.drain_secs),
            scan_timeout: self.scan_timeout_secs.map(Duration::from_secs),
            measurement_buffer: self.measurement_buffer,
        }
    }
}
