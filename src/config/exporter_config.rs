use std::net::SocketAddr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::bluetooth::DEFAULT_LISTEN_ADDRESS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Address the `/metrics` endpoint binds to
    pub listen_address: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
        }
    }
}

impl ExporterConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_address
            .parse()
            .with_context(|| format!("invalid listen address {:?}", self.listen_address))
    }
}
