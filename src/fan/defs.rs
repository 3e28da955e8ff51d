use std::{collections::BTreeMap, fmt, time::Duration};

use eyre::{Result, bail, ensure};
use strum::Display;

use crate::{
    config::DeviceConfig,
    transport::{Command, PulseCode},
};

const DEFAULT_SPEED: u8 = 100;

const DEFAULT_PULSE_INTERVAL: Duration = Duration::from_millis(200);
const DEFAULT_COMMAND_PAUSE: Duration = Duration::from_millis(500);

/* == FanState == */

/// Last state the engine believes the device to be in. The device never
/// reports back, so this tracks dispatched intent, not ground truth.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FanState {
    pub power: bool,
    pub speed: u8,
    pub last_step: Option<u8>,
    pub swing: bool,
    pub clockwise: bool,
}

/* == DeviceProfile == */

/// Capabilities and step geometry of one device. Immutable after
/// construction.
#[derive(Clone, Debug)]
pub struct DeviceProfile {
    pub step_size: u8,
    pub step_count: u8,
    pub addressing: Addressing,

    pub reset_on_power_off: bool,
    pub default_speed: u8,
    pub default_baseline: Option<u8>,

    pub auto_off_after: Option<Duration>,
    pub auto_on_after: Option<Duration>,

    pub show_swing: bool,
    pub show_rotation_direction: bool,

    pub pulse_interval: Duration,
    pub command_pause: Duration,

    pub power_on: Option<PulseCode>,
    pub power_off: Option<PulseCode>,
    pub swing_toggle: Option<PulseCode>,
    pub rotate_clockwise: Option<PulseCode>,
    pub rotate_counter_clockwise: Option<PulseCode>,
}

/// How the device addresses speed. Exactly one mode applies per profile;
/// the translator and sequencer branch on it and never mix modes.
#[derive(Clone, Debug)]
pub enum Addressing {
    /// One distinct pulse per discrete level, keyed by percent.
    Levels(BTreeMap<u8, PulseCode>),
    /// A single pulse that advances through the level cycle, wrapping at the top.
    Cycle(PulseCode),
    /// Repeated increase/decrease pulses, one step at a time.
    Steps { up: PulseCode, down: PulseCode },
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
pub enum Outcome {
    Dispatched,
    NoOp,
    Dropped,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/* == Implementations == */

impl DeviceProfile {
    pub fn from_config(config: &DeviceConfig) -> Result<Self> {
        let (step_size, step_count) = step_geometry(config);
        let codes = &config.codes;

        let modes = [
            config.speed_cycle,
            codes.speed_up.is_some() || codes.speed_down.is_some(),
            !codes.speed_levels.is_empty(),
        ];

        ensure!(
            modes.iter().filter(|&&mode| mode).count() <= 1,
            "ambiguous speed addressing: configure level codes, a cycle code or up/down codes, not several"
        );

        let addressing = if config.speed_cycle {
            match codes.speed_cycle.clone() {
                Some(code) => Addressing::Cycle(code),
                None => bail!("speed_cycle is set but no cycle pulse code is configured"),
            }
        } else if codes.speed_up.is_some() || codes.speed_down.is_some() {
            match (codes.speed_up.clone(), codes.speed_down.clone()) {
                (Some(up), Some(down)) => Addressing::Steps { up, down },
                _ => bail!("relative stepping needs both speed_up and speed_down codes"),
            }
        } else {
            Addressing::Levels(codes.speed_levels.clone())
        };

        Ok(DeviceProfile {
            step_size,
            step_count,
            addressing,

            reset_on_power_off: config.reset_on_power_off,
            default_speed: config.default_speed.unwrap_or(DEFAULT_SPEED).min(100),
            default_baseline: config.default_speed_step.map(|step| step.min(step_count)),

            auto_off_after: config.auto_off_after.map(Duration::from_secs_f32),
            auto_on_after: config.auto_on_after.map(Duration::from_secs_f32),

            show_swing: config.show_swing,
            show_rotation_direction: config.show_rotation_direction,

            pulse_interval: seconds_or(config.pulse_interval, DEFAULT_PULSE_INTERVAL),
            command_pause: seconds_or(config.command_pause, DEFAULT_COMMAND_PAUSE),

            power_on: codes.power_on.clone(),
            power_off: codes.power_off.clone(),
            swing_toggle: codes.swing_toggle.clone(),
            rotate_clockwise: codes.rotate_clockwise.clone(),
            rotate_counter_clockwise: codes.rotate_counter_clockwise.clone(),
        })
    }

    /// Step index a requested percentage lands on.
    pub fn step_for(&self, percent: u8) -> u8 {
        let step = (percent as f32 / 100. * self.step_count as f32).round() as u8;
        step.min(self.step_count)
    }

    /// The levels a cycle device walks through, lowest first.
    pub fn cycle_levels(&self) -> impl Iterator<Item = u8> + '_ {
        (1..=self.step_count).map(|step| step * self.step_size)
    }

    pub fn single_command(&self, code: PulseCode) -> Command {
        Command {
            code,
            repeat: 1,
            interval: self.pulse_interval,
            pause: self.command_pause,
        }
    }
}

fn step_geometry(config: &DeviceConfig) -> (u8, u8) {
    match config.speed_steps.filter(|&steps| steps >= 1) {
        Some(steps) => {
            let steps = steps.min(100);
            ((100 / steps).max(1), steps)
        }

        None => {
            let size = config
                .step_size
                .filter(|&size| (1..=100).contains(&size))
                .unwrap_or(1);

            (size, 100 / size)
        }
    }
}

fn seconds_or(value: Option<f32>, fallback: Duration) -> Duration {
    value
        .filter(|&seconds| seconds > 0.)
        .map(Duration::from_secs_f32)
        .unwrap_or(fallback)
}

impl fmt::Display for Addressing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Addressing::Levels(levels) => write!(f, "levels({})", levels.len()),
            Addressing::Cycle(_) => write!(f, "cycle"),
            Addressing::Steps { .. } => write!(f, "steps"),
        }
    }
}

#[cfg(test)]
impl DeviceProfile {
    pub fn for_tests(addressing: Addressing) -> Self {
        DeviceProfile {
            step_size: 1,
            step_count: 100,
            addressing,

            reset_on_power_off: false,
            default_speed: 100,
            default_baseline: None,

            auto_off_after: None,
            auto_on_after: None,

            show_swing: true,
            show_rotation_direction: true,

            pulse_interval: Duration::from_millis(5),
            command_pause: Duration::from_millis(5),

            power_on: None,
            power_off: None,
            swing_toggle: None,
            rotate_clockwise: None,
            rotate_counter_clockwise: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CodeTable;

    use super::*;

    fn code(byte: u8) -> PulseCode {
        PulseCode::from_hex(&format!("{byte:02x}")).unwrap()
    }

    fn base_config() -> DeviceConfig {
        DeviceConfig {
            name: "test".to_owned(),
            transport: Default::default(),
            step_size: None,
            speed_steps: None,
            speed_cycle: false,
            reset_on_power_off: false,
            default_speed: None,
            default_speed_step: None,
            auto_off_after: None,
            auto_on_after: None,
            show_swing: true,
            show_rotation_direction: true,
            pulse_interval: None,
            command_pause: None,
            codes: CodeTable::default(),
        }
    }

    #[test]
    fn speed_steps_derive_step_size() {
        let mut config = base_config();
        config.speed_steps = Some(24);

        let profile = DeviceProfile::from_config(&config).unwrap();

        assert_eq!(profile.step_count, 24);
        assert_eq!(profile.step_size, 4);
    }

    #[test]
    fn invalid_step_size_falls_back_to_one() {
        let mut config = base_config();
        config.step_size = Some(101);

        let profile = DeviceProfile::from_config(&config).unwrap();

        assert_eq!(profile.step_size, 1);
        assert_eq!(profile.step_count, 100);
    }

    #[test]
    fn ambiguous_addressing_is_rejected() {
        let mut config = base_config();
        config.codes.speed_up = Some(code(0x10));
        config.codes.speed_down = Some(code(0x11));
        config.codes.speed_levels.insert(50, code(0x12));

        assert!(DeviceProfile::from_config(&config).is_err());
    }

    #[test]
    fn cycle_flag_requires_cycle_code() {
        let mut config = base_config();
        config.speed_cycle = true;

        assert!(DeviceProfile::from_config(&config).is_err());
    }

    #[test]
    fn default_speed_is_clamped() {
        let mut config = base_config();
        config.default_speed = Some(180);

        let profile = DeviceProfile::from_config(&config).unwrap();

        assert_eq!(profile.default_speed, 100);
    }

    #[test]
    fn step_for_rounds_and_clamps() {
        let mut profile = DeviceProfile::for_tests(Addressing::Levels(Default::default()));
        profile.step_count = 24;
        profile.step_size = 4;

        assert_eq!(profile.step_for(0), 0);
        assert_eq!(profile.step_for(60), 14);
        assert_eq!(profile.step_for(100), 24);
    }
}
