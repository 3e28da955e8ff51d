use std::sync::Arc;

use super::defs::{DeviceProfile, Direction, FanState};

/// Sole owner of a device's state and profile. Mutations flow through the
/// controller pipeline; nothing else writes here.
pub struct StateStore {
    profile: Arc<DeviceProfile>,
    state: FanState,
}

#[derive(Copy, Clone, Debug)]
pub enum Mutation {
    Power(bool),
    Speed(u8),
    LastStep(u8),
    ResetBaseline,
    Swing(bool),
    Rotation(Direction),
    ResetDefaults,
}

impl StateStore {
    pub fn new(profile: DeviceProfile) -> Self {
        let state = FanState {
            power: false,
            speed: profile.default_speed,
            last_step: profile.default_baseline,
            swing: false,
            clockwise: true,
        };

        StateStore {
            profile: Arc::new(profile),
            state,
        }
    }

    pub fn snapshot(&self) -> FanState {
        self.state
    }

    pub fn profile(&self) -> Arc<DeviceProfile> {
        self.profile.clone()
    }

    pub fn apply(&mut self, mutation: Mutation) -> FanState {
        match mutation {
            Mutation::Power(on) => self.state.power = on,
            Mutation::Speed(percent) => self.state.speed = percent.min(100),

            Mutation::LastStep(step) => {
                self.state.last_step = Some(step.min(self.profile.step_count));
            }

            Mutation::ResetBaseline => self.state.last_step = self.profile.default_baseline,
            Mutation::Swing(on) => self.state.swing = on,
            Mutation::Rotation(direction) => {
                self.state.clockwise = direction == Direction::Clockwise;
            }

            Mutation::ResetDefaults => {
                self.state.speed = self.profile.default_speed;
                self.state.last_step = self.profile.default_baseline;
            }
        }

        self.state
    }
}
