use std::{future::Future, pin::Pin, sync::Arc};

use eyre::{Context, Result};
use tokio::sync::Mutex;

use crate::{
    config::DeviceConfig,
    transport::{self, Command, Transport},
};

use self::{
    lock::ActuationLock,
    sequence::sequence,
    state::{Mutation, StateStore},
    timer::AutoTimer,
    translate::{Target, translate},
};

pub mod defs;
pub mod lock;
pub mod sequence;
pub mod state;
pub mod timer;
pub mod translate;

pub use defs::{Addressing, DeviceProfile, Direction, FanState, Outcome};

/* === Definitions === */

/// One open-loop fan, driven over a blind pulse transport.
///
/// Every state change runs the same pipeline: cancel timers, build the
/// pulse sequence, dispatch under the actuation lock, re-arm timers. Auto
/// power transitions funnel through the same pipeline as user requests, so
/// a firing watchdog and a concurrent user operation cannot collide.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    store: Mutex<StateStore>,
    lock: ActuationLock,
    timers: AutoTimer,
    transport: Arc<dyn Transport>,
}

enum Op {
    Power(bool),
    Speed(u8),
    Swing(bool),
    Rotation(Direction),
}

/* === Implementations === */

impl Controller {
    pub fn new(name: impl Into<String>, profile: DeviceProfile, transport: Arc<dyn Transport>) -> Self {
        Controller {
            inner: Arc::new(Inner {
                name: name.into(),
                store: Mutex::new(StateStore::new(profile)),
                lock: ActuationLock::new(),
                timers: AutoTimer::new(),
                transport,
            }),
        }
    }

    pub async fn from_config(config: &DeviceConfig) -> Result<Self> {
        let profile = DeviceProfile::from_config(config)
            .wrap_err_with(|| format!("Invalid profile for {}", config.name))?;

        let transport = transport::connect(&config.transport).await?;

        Ok(Self::new(config.name.clone(), profile, transport))
    }

    /* == Public API == */

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub async fn state(&self) -> FanState {
        self.inner.store.lock().await.snapshot()
    }

    pub async fn set_power(&self, on: bool) -> Result<Outcome> {
        Self::operate(&self.inner, Op::Power(on)).await
    }

    pub async fn set_speed(&self, percent: u8) -> Result<Outcome> {
        Self::operate(&self.inner, Op::Speed(percent)).await
    }

    pub async fn set_swing(&self, on: bool) -> Result<Outcome> {
        Self::operate(&self.inner, Op::Swing(on)).await
    }

    pub async fn set_direction(&self, direction: Direction) -> Result<Outcome> {
        Self::operate(&self.inner, Op::Rotation(direction)).await
    }

    /// Arm the auto timers for the current settled state.
    pub async fn arm_timers(&self) {
        Self::rearm(&self.inner).await;
    }

    /* == Pipeline == */

    fn operate<'a>(
        inner: &'a Arc<Inner>,
        op: Op,
    ) -> Pin<Box<dyn Future<Output = Result<Outcome>> + Send + 'a>> {
        Box::pin(async move {
            // No pending timer may outlive the state it was armed against.
            inner.timers.cancel_all();

            let result = Self::run(inner, op).await;

            // Timers re-arm on every settling path: success, no-op, drop and
            // transport failure alike.
            Self::rearm(inner).await;

            result
        })
    }

    async fn run(inner: &Arc<Inner>, op: Op) -> Result<Outcome> {
        let (state, profile) = {
            let store = inner.store.lock().await;
            (store.snapshot(), store.profile())
        };

        match op {
            Op::Power(on) => Self::power_op(inner, &state, &profile, on).await,
            Op::Speed(percent) => Self::speed_op(inner, &state, &profile, percent).await,
            Op::Swing(on) => Self::swing_op(inner, &profile, on).await,
            Op::Rotation(direction) => Self::rotation_op(inner, &profile, direction).await,
        }
    }

    async fn power_op(
        inner: &Arc<Inner>,
        state: &FanState,
        profile: &DeviceProfile,
        on: bool,
    ) -> Result<Outcome> {
        let code = if on {
            profile.power_on.clone()
        } else {
            profile.power_off.clone()
        };

        let commands = match code {
            Some(code) => vec![profile.single_command(code)],
            None => {
                tracing::warn!(device = %inner.name, on, "no power pulse code configured");
                Vec::new()
            }
        };

        let outcome = Self::dispatch(inner, commands, None).await?;

        if outcome != Outcome::Dropped {
            let mut store = inner.store.lock().await;

            store.apply(Mutation::Power(on));

            if on && !state.power {
                // Position is unknown after a power cycle.
                store.apply(Mutation::ResetBaseline);
            }

            if !on && profile.reset_on_power_off {
                store.apply(Mutation::ResetDefaults);
            }
        }

        Ok(outcome)
    }

    async fn speed_op(
        inner: &Arc<Inner>,
        state: &FanState,
        profile: &DeviceProfile,
        percent: u8,
    ) -> Result<Outcome> {
        let requested = percent.min(100);

        let target = match translate(requested, state.last_step, profile) {
            Ok(target) => target,

            // Translator failures degrade to a no-op; the device is simply
            // not addressable for this request.
            Err(error) => {
                tracing::warn!(device = %inner.name, requested, %error, "speed request ignored");
                return Ok(Outcome::NoOp);
            }
        };

        let commands = sequence(target, state.last_step, profile);

        let step = match target {
            Target::Absolute { step, .. } | Target::Relative { step, .. } => step,
        };

        let outcome = Self::dispatch(inner, commands, Some(step)).await?;

        if outcome != Outcome::Dropped {
            inner.store.lock().await.apply(Mutation::Speed(requested));
        }

        Ok(outcome)
    }

    async fn swing_op(inner: &Arc<Inner>, profile: &DeviceProfile, on: bool) -> Result<Outcome> {
        if !profile.show_swing {
            return Ok(Outcome::NoOp);
        }

        let Some(code) = profile.swing_toggle.clone() else {
            tracing::warn!(device = %inner.name, "no swing pulse code configured");
            return Ok(Outcome::NoOp);
        };

        let outcome = Self::dispatch(inner, vec![profile.single_command(code)], None).await?;

        if outcome != Outcome::Dropped {
            inner.store.lock().await.apply(Mutation::Swing(on));
        }

        Ok(outcome)
    }

    async fn rotation_op(
        inner: &Arc<Inner>,
        profile: &DeviceProfile,
        direction: Direction,
    ) -> Result<Outcome> {
        if !profile.show_rotation_direction {
            return Ok(Outcome::NoOp);
        }

        let code = match direction {
            Direction::Clockwise => profile.rotate_clockwise.clone(),
            Direction::CounterClockwise => profile.rotate_counter_clockwise.clone(),
        };

        let Some(code) = code else {
            tracing::warn!(device = %inner.name, ?direction, "no rotation pulse code configured");
            return Ok(Outcome::NoOp);
        };

        let outcome = Self::dispatch(inner, vec![profile.single_command(code)], None).await?;

        if outcome != Outcome::Dropped {
            inner.store.lock().await.apply(Mutation::Rotation(direction));
        }

        Ok(outcome)
    }

    async fn dispatch(
        inner: &Arc<Inner>,
        commands: Vec<Command>,
        target_step: Option<u8>,
    ) -> Result<Outcome> {
        inner
            .lock
            .dispatch(&inner.store, inner.transport.as_ref(), commands, target_step)
            .await
            .wrap_err_with(|| format!("{}: dispatch failed", inner.name))
    }

    /* == Auto timers == */

    async fn rearm(inner: &Arc<Inner>) {
        let (state, profile) = {
            let store = inner.store.lock().await;
            (store.snapshot(), store.profile())
        };

        if state.power {
            if let Some(delay) = profile.auto_off_after {
                tracing::debug!(device = %inner.name, ?delay, "arming auto-off");

                let weak = Arc::downgrade(inner);

                inner.timers.arm_off(delay, move || async move {
                    if let Some(inner) = weak.upgrade() {
                        tracing::info!(device = %inner.name, "auto-off delay elapsed");

                        if let Err(error) = Controller::operate(&inner, Op::Power(false)).await {
                            tracing::warn!(device = %inner.name, %error, "auto power-off failed");
                        }
                    }
                });
            }
        } else if let Some(delay) = profile.auto_on_after {
            tracing::debug!(device = %inner.name, ?delay, "arming auto-on");

            let weak = Arc::downgrade(inner);

            inner.timers.arm_on(delay, move || async move {
                if let Some(inner) = weak.upgrade() {
                    tracing::info!(device = %inner.name, "auto-on delay elapsed");

                    if let Err(error) = Controller::operate(&inner, Op::Power(true)).await {
                        tracing::warn!(device = %inner.name, %error, "auto power-on failed");
                    }
                }
            });
        }
    }
}
