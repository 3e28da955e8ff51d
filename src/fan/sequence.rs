use std::time::Duration;

use crate::transport::Command;

use super::{
    defs::{Addressing, DeviceProfile},
    translate::Target,
};

/// Build the pulse commands that move the device to the target.
///
/// An empty list is a no-op: the dispatch stage records the target step but
/// never touches the transport.
pub fn sequence(target: Target, current: Option<u8>, profile: &DeviceProfile) -> Vec<Command> {
    match (target, &profile.addressing) {
        (Target::Absolute { level, step }, Addressing::Levels(levels)) => {
            if current == Some(step) {
                return Vec::new();
            }

            // The translator picked the level from this map.
            match levels.get(&level) {
                Some(code) => vec![profile.single_command(code.clone())],
                None => Vec::new(),
            }
        }

        (Target::Absolute { step, .. }, Addressing::Cycle(code)) => {
            // Without a known position there is nothing safe to cycle; the
            // recorded target becomes the baseline for the next request.
            let Some(current) = current else {
                return Vec::new();
            };

            let distance = cycle_distance(current, step, profile.step_count);

            if distance == 0 {
                return Vec::new();
            }

            vec![Command {
                code: code.clone(),
                repeat: u32::from(distance),
                interval: profile.pulse_interval,
                pause: Duration::ZERO,
            }]
        }

        (Target::Relative { diff, .. }, Addressing::Steps { up, down }) => {
            if diff == 0 {
                return Vec::new();
            }

            let code = if diff >= 0 { up } else { down };

            vec![Command {
                code: code.clone(),
                repeat: u32::from(diff.unsigned_abs()),
                interval: profile.pulse_interval,
                pause: Duration::ZERO,
            }]
        }

        // The translator and the profile branch on the same addressing mode.
        _ => unreachable!("translator output does not match profile addressing"),
    }
}

/// Forward distance from `current` to `target` over the cycle `[0, step_count]`,
/// wrapping through the maximum and back to zero.
fn cycle_distance(current: u8, target: u8, step_count: u8) -> u8 {
    if current > target {
        (step_count - current) + target
    } else {
        target - current
    }
}
