// ## src/config.rs

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PIPE_CAPACITY, DEFAULT_SDK_TYPE, POOL_SIZE, READ_CHUNK_SIZE};
use crate::types::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Workers draining the outbound HTTP queue.
    pub pool_size: usize,

    /// Bytes requested from the native pull-stream per pump iteration.
    pub read_chunk_size: usize,

    /// Chunks buffered between pump and consumer before the pump blocks.
    pub pipe_capacity: usize,

    /// Sent as `X-Tanker-SdkType` on every outbound request.
    pub sdk_type: String,

    /// Sent as `X-Tanker-SdkVersion` on every outbound request.
    pub sdk_version: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            pool_size: POOL_SIZE,
            read_chunk_size: READ_CHUNK_SIZE,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            sdk_type: DEFAULT_SDK_TYPE.to_string(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.pool_size == 0 {
            return Err(BridgeError::Config("pool_size must be at least 1".into()));
        }
        if self.read_chunk_size == 0 {
            return Err(BridgeError::Config("read_chunk_size must be at least 1".into()));
        }
        if self.pipe_capacity == 0 {
            return Err(BridgeError::Config("pipe_capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// Parse and validate. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, BridgeError> {
        let config: BridgeConfig =
            serde_json::from_str(raw).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn identity(&self) -> ClientIdentity {
        ClientIdentity {
            sdk_type: self.sdk_type.clone(),
            sdk_version: self.sdk_version.clone(),
        }
    }
}

/// Who we are, as told to the server on each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub sdk_type: String,
    pub sdk_version: String,
}
