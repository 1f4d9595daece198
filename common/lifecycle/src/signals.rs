use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::LifecycleError;
use crate::event::{EventSender, TerminationEvent};

/// Re-emits SIGINT and SIGTERM as [`TerminationEvent`]s. Handlers are registered
/// by [`install`](SignalWatcher::install), so signals delivered before
/// [`spawn`](SignalWatcher::spawn) are still observed.
pub struct SignalWatcher {
    interrupt: Signal,
    terminate: Signal,
}

impl SignalWatcher {
    /// Register the handlers. Must be called from within a tokio runtime.
    pub fn install() -> Result<Self, LifecycleError> {
        let interrupt =
            signal(SignalKind::interrupt()).map_err(|source| LifecycleError::SignalInstall {
                signal: "SIGINT",
                source,
            })?;
        let terminate =
            signal(SignalKind::terminate()).map_err(|source| LifecycleError::SignalInstall {
                signal: "SIGTERM",
                source,
            })?;
        Ok(Self {
            interrupt,
            terminate,
        })
    }

    /// Forward every notification until the stream's reader goes away.
    pub fn spawn(mut self, events: EventSender) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = self.next().await {
                if !events.send(event).await {
                    debug!("Lifecycle: event stream closed, signal watcher exiting");
                    return;
                }
            }
        })
    }

    async fn next(&mut self) -> Option<TerminationEvent> {
        tokio::select! {
            sig = self.interrupt.recv() => sig.map(|_| TerminationEvent::Interrupt),
            sig = self.terminate.recv() => sig.map(|_| TerminationEvent::Terminate),
        }
    }
}
