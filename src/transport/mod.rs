use std::{fmt, io, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use eyre::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

use crate::config::TransportConfig;

pub mod mock;
pub mod udp;

pub use mock::MockTransport;
pub use udp::UdpBlaster;

/* === Definitions === */

/// An opaque pulse payload, configured as a hex string.
#[derive(Clone, PartialEq, Eq)]
pub struct PulseCode(Bytes);

/// One entry of a dispatch list: a pulse, how often to repeat it, the gap
/// between repeats and the gap before the next distinct entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub code: PulseCode,
    pub repeat: u32,
    pub interval: Duration,
    pub pause: Duration,
}

#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(#[from] pub io::Error);

/// The device-facing side of the engine. Implementations must honour each
/// command's repeat count, interval and pause.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, commands: &[Command]) -> Result<(), TransportError>;
}

/* === Implementations === */

pub async fn connect(config: &TransportConfig) -> Result<Arc<dyn Transport>> {
    match config {
        TransportConfig::Udp { ip, port } => {
            let blaster = UdpBlaster::bind(*ip, *port)
                .await
                .wrap_err("Failed to bind pulse transport")?;

            Ok(Arc::new(blaster))
        }

        TransportConfig::Mock => Ok(Arc::new(MockTransport::new())),
    }
}

impl PulseCode {
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        Ok(PulseCode(Bytes::from(hex::decode(hex)?)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PulseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PulseCode({})", hex::encode(&self.0))
    }
}

impl Serialize for PulseCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for PulseCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        PulseCode::from_hex(&hex).map_err(de::Error::custom)
    }
}
