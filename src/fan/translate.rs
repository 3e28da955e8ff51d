use thiserror::Error;

use super::defs::{Addressing, DeviceProfile};

/* == Definitions == */

/// Where a speed request lands in the device's addressing scheme.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Absolute { level: u8, step: u8 },
    Relative { step: u8, diff: i16 },
}

#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("no speed levels configured")]
    NoLevelsConfigured,

    #[error("no baseline step known, relative stepping needs an absolute sync first")]
    NoBaselineStep,
}

/* == Implementation == */

/// Map a requested percentage onto the device's addressing scheme.
pub fn translate(
    requested: u8,
    last_step: Option<u8>,
    profile: &DeviceProfile,
) -> Result<Target, TranslateError> {
    match &profile.addressing {
        Addressing::Levels(levels) => {
            let level = closest_level(levels.keys().copied(), requested)
                .ok_or(TranslateError::NoLevelsConfigured)?;

            Ok(Target::Absolute {
                level,
                step: profile.step_for(level),
            })
        }

        Addressing::Cycle(_) => {
            let level = closest_level(profile.cycle_levels(), requested)
                .ok_or(TranslateError::NoLevelsConfigured)?;

            Ok(Target::Absolute {
                level,
                step: level / profile.step_size,
            })
        }

        Addressing::Steps { .. } => {
            let last = last_step.ok_or(TranslateError::NoBaselineStep)?;
            let step = profile.step_for(requested);

            Ok(Target::Relative {
                step,
                diff: i16::from(step) - i16::from(last),
            })
        }
    }
}

// Exact ties resolve to the smaller level; callers rely on this being stable.
fn closest_level(levels: impl Iterator<Item = u8>, requested: u8) -> Option<u8> {
    levels.min_by_key(|&level| (level.abs_diff(requested), level))
}

#[cfg(test)]
mod tests {
    use crate::transport::PulseCode;

    use super::*;

    fn code(byte: u8) -> PulseCode {
        PulseCode::from_hex(&format!("{byte:02x}")).unwrap()
    }

    fn levels_profile(levels: &[u8]) -> DeviceProfile {
        let map = levels.iter().map(|&level| (level, code(level))).collect();
        DeviceProfile::for_tests(Addressing::Levels(map))
    }

    fn steps_profile() -> DeviceProfile {
        let mut profile = DeviceProfile::for_tests(Addressing::Steps {
            up: code(0x10),
            down: code(0x11),
        });

        profile.step_count = 24;
        profile.step_size = 4;
        profile
    }

    #[test]
    fn selects_closest_level() {
        let profile = levels_profile(&[25, 50, 75, 100]);

        let target = translate(60, None, &profile).unwrap();
        assert_eq!(target, Target::Absolute { level: 50, step: 50 });
    }

    #[test]
    fn exact_tie_prefers_smaller_level() {
        let profile = levels_profile(&[30, 70]);

        let target = translate(50, None, &profile).unwrap();
        assert_eq!(target, Target::Absolute { level: 30, step: 30 });
    }

    #[test]
    fn no_levels_is_reported() {
        let profile = levels_profile(&[]);

        let result = translate(50, None, &profile);
        assert_eq!(result, Err(TranslateError::NoLevelsConfigured));
    }

    #[test]
    fn relative_target_rounds_to_nearest_step() {
        let profile = steps_profile();

        let target = translate(60, Some(12), &profile).unwrap();
        assert_eq!(target, Target::Relative { step: 14, diff: 2 });
    }

    #[test]
    fn relative_diff_can_be_negative() {
        let profile = steps_profile();

        let target = translate(10, Some(12), &profile).unwrap();
        assert_eq!(target, Target::Relative { step: 2, diff: -10 });
    }

    #[test]
    fn relative_mode_needs_a_baseline() {
        let profile = steps_profile();

        let result = translate(60, None, &profile);
        assert_eq!(result, Err(TranslateError::NoBaselineStep));
    }

    #[test]
    fn cycle_mode_snaps_to_synthesized_levels() {
        let mut profile = DeviceProfile::for_tests(Addressing::Cycle(code(0x20)));
        profile.step_count = 24;
        profile.step_size = 4;

        let target = translate(17, Some(20), &profile).unwrap();
        assert_eq!(target, Target::Absolute { level: 16, step: 4 });
    }
}
