use std::{collections::BTreeMap, net::IpAddr, path::Path};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::transport::PulseCode;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub name: String,

    #[serde(default)]
    pub transport: TransportConfig,

    /// Percent moved per discrete step. Out-of-range values fall back to 1.
    pub step_size: Option<u8>,
    /// Number of discrete steps; takes precedence over `step_size`.
    pub speed_steps: Option<u8>,
    #[serde(default)]
    pub speed_cycle: bool,

    #[serde(default)]
    pub reset_on_power_off: bool,
    pub default_speed: Option<u8>,
    pub default_speed_step: Option<u8>,

    /// Seconds until an automatic power-off while on.
    pub auto_off_after: Option<f32>,
    /// Seconds until an automatic power-on while off.
    pub auto_on_after: Option<f32>,

    #[serde(default = "default_true")]
    pub show_swing: bool,
    #[serde(default = "default_true")]
    pub show_rotation_direction: bool,

    /// Seconds between repeats of a single pulse.
    pub pulse_interval: Option<f32>,
    /// Seconds between distinct commands in a dispatch list.
    pub command_pause: Option<f32>,

    #[serde(default)]
    pub codes: CodeTable,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CodeTable {
    pub power_on: Option<PulseCode>,
    pub power_off: Option<PulseCode>,
    pub swing_toggle: Option<PulseCode>,
    pub rotate_clockwise: Option<PulseCode>,
    pub rotate_counter_clockwise: Option<PulseCode>,
    pub speed_cycle: Option<PulseCode>,
    pub speed_up: Option<PulseCode>,
    pub speed_down: Option<PulseCode>,
    #[serde(default)]
    pub speed_levels: BTreeMap<u8, PulseCode>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    Udp {
        ip: IpAddr,
        #[serde(default = "default_udp_port")]
        port: u16,
    },
    Mock,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let data = fs::read(path)
            .await
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;

        serde_yaml::from_slice(&data).wrap_err_with(|| format!("Failed to parse {}", path.display()))
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Mock
    }
}

const fn default_true() -> bool {
    true
}

const fn default_udp_port() -> u16 {
    8090
}
