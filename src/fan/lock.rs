use tokio::sync::Mutex;

use crate::transport::{Command, Transport, TransportError};

use super::{
    defs::Outcome,
    state::{Mutation, StateStore},
};

/// Mutual exclusion for in-flight dispatches. One per device, never shared
/// across devices.
///
/// A request that arrives while a dispatch is in flight is dropped, not
/// queued: queued speed requests would pile up and overshoot a device that
/// cannot report its true state. The caller re-issues once settled.
#[derive(Default)]
pub struct ActuationLock {
    busy: Mutex<()>,
}

impl ActuationLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one guarded dispatch: record intent, emit, confirm.
    ///
    /// The target step is written before the transport call so concurrent
    /// readers see the pending position, and re-written idempotently once
    /// the transport returns. The lock is released on every path; transport
    /// failures are propagated, never retried here.
    pub async fn dispatch(
        &self,
        store: &Mutex<StateStore>,
        transport: &dyn Transport,
        commands: Vec<Command>,
        target_step: Option<u8>,
    ) -> Result<Outcome, TransportError> {
        let Ok(_guard) = self.busy.try_lock() else {
            tracing::debug!("dispatch in flight, dropping request");
            return Ok(Outcome::Dropped);
        };

        if let Some(step) = target_step {
            store.lock().await.apply(Mutation::LastStep(step));
        }

        if commands.is_empty() {
            return Ok(Outcome::NoOp);
        }

        transport.dispatch(&commands).await?;

        if let Some(step) = target_step {
            store.lock().await.apply(Mutation::LastStep(step));
        }

        Ok(Outcome::Dispatched)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::task::yield_now;

    use crate::transport::MockTransport;

    use super::super::defs::{Addressing, DeviceProfile};
    use super::*;

    fn fixture(latency: Duration) -> (Arc<ActuationLock>, Arc<Mutex<StateStore>>, Arc<MockTransport>) {
        let profile = DeviceProfile::for_tests(Addressing::Levels(Default::default()));

        (
            Arc::new(ActuationLock::new()),
            Arc::new(Mutex::new(StateStore::new(profile))),
            Arc::new(MockTransport::with_latency(latency)),
        )
    }

    fn command() -> Command {
        let profile = DeviceProfile::for_tests(Addressing::Levels(Default::default()));
        profile.single_command(crate::transport::PulseCode::from_hex("aa").unwrap())
    }

    #[tokio::test]
    async fn empty_list_records_target_without_transport() {
        let (lock, store, mock) = fixture(Duration::ZERO);

        let outcome = lock
            .dispatch(&store, mock.as_ref(), Vec::new(), Some(7))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::NoOp);
        assert!(mock.batches().is_empty());
        assert_eq!(store.lock().await.snapshot().last_step, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_dispatch_drops_newcomers() {
        let (lock, store, mock) = fixture(Duration::from_secs(1));

        let first = {
            let (lock, store, mock) = (lock.clone(), store.clone(), mock.clone());

            tokio::spawn(async move {
                lock.dispatch(&store, mock.as_ref(), vec![command()], Some(3))
                    .await
                    .unwrap()
            })
        };

        for _ in 0..5 {
            yield_now().await;
        }

        let second = lock
            .dispatch(&store, mock.as_ref(), vec![command()], Some(9))
            .await
            .unwrap();

        assert_eq!(second, Outcome::Dropped);
        assert_eq!(first.await.unwrap(), Outcome::Dispatched);

        // The dropped request never touched the target step.
        assert_eq!(store.lock().await.snapshot().last_step, Some(3));
        assert_eq!(mock.batches().len(), 1);
    }

    #[tokio::test]
    async fn failure_releases_the_lock() {
        let (lock, store, mock) = fixture(Duration::ZERO);

        mock.fail_next();

        let result = lock
            .dispatch(&store, mock.as_ref(), vec![command()], Some(3))
            .await;
        assert!(result.is_err());

        let outcome = lock
            .dispatch(&store, mock.as_ref(), vec![command()], Some(3))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Dispatched);
    }
}
