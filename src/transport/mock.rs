use std::{
    io,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::sleep;

use super::{Command, Transport, TransportError};

/// Records dispatched batches instead of reaching hardware. Used by the
/// test suite and by `transport: mock` configurations for dry runs.
#[derive(Default)]
pub struct MockTransport {
    latency: Duration,
    fail_next: AtomicBool,
    sent: Mutex<Vec<Vec<Command>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        MockTransport {
            latency,
            ..Default::default()
        }
    }

    /// Make the next dispatch fail with a simulated transport error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::Relaxed);
    }

    pub fn batches(&self) -> Vec<Vec<Command>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn dispatch(&self, commands: &[Command]) -> Result<(), TransportError> {
        if self.fail_next.swap(false, Ordering::Relaxed) {
            return Err(TransportError(io::Error::other("simulated transport failure")));
        }

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        self.sent.lock().unwrap().push(commands.to_vec());

        Ok(())
    }
}
