use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::bluetooth::{DEFAULT_DWELL_SECS, DEFAULT_MTU, SENSOR_LOCAL_NAME};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Advertised local name to connect to, compared case-insensitively
    pub local_name: String,

    /// MTU requested after connecting
    pub mtu: u16,

    /// Seconds a configured connection is held open for notifications
    pub dwell_secs: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig {
            local_name: SENSOR_LOCAL_NAME.to_string(),
            mtu: DEFAULT_MTU,
            dwell_secs: DEFAULT_DWELL_SECS,
        }
    }
}

impl SensorConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_secs(self.dwell_secs)
    }
}
