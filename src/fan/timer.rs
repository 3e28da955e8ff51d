use std::{future::Future, sync::Mutex, time::Duration};

use tokio::{select, sync::watch, time::sleep};

/* == Cancellable delay == */

/// One cancellable delayed action: pending until it elapses or is canceled.
/// Cancellation resolves the wait silently and never runs the action.
#[derive(Default)]
pub struct Countdown {
    handle: Mutex<Option<DelayHandle>>,
}

struct DelayHandle {
    cancel: watch::Sender<bool>,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot, replacing (and canceling) any pending delay.
    pub fn arm<F, Fut>(&self, duration: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel, mut canceled) = watch::channel(false);

        self.replace(Some(DelayHandle { cancel }));

        tokio::spawn(async move {
            select! {
                _ = sleep(duration) => action().await,
                _ = async { canceled.wait_for(|&canceled| canceled).await.ok(); } => {}
            }
        });
    }

    /// Idempotent; a no-op on a settled or never-armed slot.
    pub fn cancel(&self) {
        self.replace(None);
    }

    fn replace(&self, new: Option<DelayHandle>) {
        let old = {
            let mut slot = self.handle.lock().unwrap();
            std::mem::replace(&mut *slot, new)
        };

        if let Some(handle) = old {
            // Receivers of a settled delay are gone; the send result is moot.
            let _ = handle.cancel.send(true);
        }
    }
}

/* == Auto on/off == */

/// The two watchdog slots driving delayed automatic power transitions.
#[derive(Default)]
pub struct AutoTimer {
    off: Countdown,
    on: Countdown,
}

impl AutoTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm_off<F, Fut>(&self, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.off.arm(delay, action);
    }

    pub fn arm_on<F, Fut>(&self, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on.arm(delay, action);
    }

    /// Canceling timers that are not pending is a silent no-op.
    pub fn cancel_all(&self) {
        self.off.cancel();
        self.on.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn counter_action(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> futures::future::Ready<()> + use<> {
        let counter = counter.clone();

        move || {
            counter.fetch_add(1, Ordering::Relaxed);
            futures::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_the_delay_elapses() {
        let counter = Arc::new(AtomicUsize::new(0));
        let timer = Countdown::new();

        timer.arm(Duration::from_secs(5), counter_action(&counter));

        sleep(Duration::from_secs(6)).await;
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_action() {
        let counter = Arc::new(AtomicUsize::new(0));
        let timer = Countdown::new();

        timer.arm(Duration::from_secs(5), counter_action(&counter));

        sleep(Duration::from_secs(2)).await;
        timer.cancel();

        sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let timer = Countdown::new();

        // Never armed.
        timer.cancel();

        timer.arm(Duration::from_secs(5), counter_action(&counter));
        timer.cancel();
        timer.cancel();

        sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_pending_delay() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let timer = Countdown::new();

        timer.arm(Duration::from_secs(5), counter_action(&first));
        timer.arm(Duration::from_secs(8), counter_action(&second));

        sleep(Duration::from_secs(10)).await;

        assert_eq!(first.load(Ordering::Relaxed), 0);
        assert_eq!(second.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_timer_cancels_both_slots() {
        let counter = Arc::new(AtomicUsize::new(0));
        let timers = AutoTimer::new();

        timers.arm_off(Duration::from_secs(5), counter_action(&counter));
        timers.arm_on(Duration::from_secs(5), counter_action(&counter));

        timers.cancel_all();
        timers.cancel_all();

        sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }
}
