//! Self-termination for test runs.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::event::{EventSender, TerminationEvent};

/// Delay before a test-mode process stops itself.
pub const DEFAULT_TEST_MODE_DELAY: Duration = Duration::from_secs(10);

/// One-shot countdown that injects a [`TerminationEvent::TestTrigger`] onto the
/// same stream the [`SignalWatcher`](crate::SignalWatcher) feeds. Spawning
/// consumes the timer, so it fires at most once.
#[derive(Clone, Copy, Debug)]
pub struct TestModeTimer {
    delay: Duration,
}

impl TestModeTimer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn spawn(self, events: EventSender) -> JoinHandle<()> {
        let delay = self.delay;
        info!(
            delay_secs = delay.as_secs_f64(),
            "Lifecycle: started in test mode, stopping in {} seconds",
            delay.as_secs()
        );
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if events.send(TerminationEvent::TestTrigger).await {
                info!("Lifecycle: test mode timer expired");
            } else {
                debug!("Lifecycle: test mode timer expired after coordinator exited");
            }
        })
    }
}
