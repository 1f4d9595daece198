//! Lifecycle manager: starts one background subsystem, stops it on request, reports the exit code.

use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn, Instrument};

use crate::error::SubsystemError;
use crate::metrics;
use crate::EXIT_CLEAN;

/// The long-running part of the application whose lifetime the manager owns.
///
/// `start` may be cancelled (its future dropped) if shutdown is requested before it
/// resolves; `stop` is called afterwards regardless, so it must cope with a
/// partially started subsystem.
#[async_trait]
pub trait Subsystem: Send + 'static {
    async fn start(&mut self) -> Result<(), SubsystemError>;

    async fn stop(&mut self) -> Result<(), SubsystemError>;
}

/// "Begin graceful shutdown now." Sent at most once, over a oneshot channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShutdownRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

enum Startup {
    Ready,
    Failed(SubsystemError),
    Interrupted,
}

/// Owns a [`Subsystem`] and drives it through [`LifecyclePhase`]s. Consumed by
/// [`start`](LifecycleManager::start); there is no restart after `Terminated`.
pub struct LifecycleManager<S> {
    name: String,
    subsystem: S,
    phase_tx: watch::Sender<LifecyclePhase>,
}

impl<S: Subsystem> LifecycleManager<S> {
    pub fn new(name: impl Into<String>, subsystem: S) -> Self {
        let (phase_tx, _) = watch::channel(LifecyclePhase::Starting);
        Self {
            name: name.into(),
            subsystem,
            phase_tx,
        }
    }

    /// Observe phase transitions. Subscribe before calling [`start`](LifecycleManager::start).
    pub fn phase(&self) -> watch::Receiver<LifecyclePhase> {
        self.phase_tx.subscribe()
    }

    /// Spawn the manager task. The returned receiver yields the exit code exactly once,
    /// and only after a [`ShutdownRequest`] arrived (or its sender was dropped).
    pub fn start(self, shutdown_rx: oneshot::Receiver<ShutdownRequest>) -> oneshot::Receiver<i32> {
        let (code_tx, code_rx) = oneshot::channel();
        let span = tracing::info_span!("lifecycle_manager", app = %self.name);
        tokio::spawn(
            async move {
                let code = self.run(shutdown_rx).await;
                if code_tx.send(code).is_err() {
                    debug!("Lifecycle: exit code receiver dropped");
                }
            }
            .instrument(span),
        );
        code_rx
    }

    async fn run(mut self, mut shutdown_rx: oneshot::Receiver<ShutdownRequest>) -> i32 {
        debug!(phase = ?LifecyclePhase::Starting, "Lifecycle: starting subsystem");

        let startup = tokio::select! {
            result = self.subsystem.start() => match result {
                Ok(()) => Startup::Ready,
                Err(e) => Startup::Failed(e),
            },
            _ = &mut shutdown_rx => Startup::Interrupted,
        };

        let mut failure = None;
        match startup {
            Startup::Ready => {
                self.transition(LifecyclePhase::Running);
                info!("Lifecycle: subsystem running");
                wait_for_request(shutdown_rx).await;
            }
            Startup::Failed(e) => {
                error!(
                    reason = e.reason(),
                    exit_code = e.exit_code(),
                    "Lifecycle: subsystem failed to start"
                );
                failure = Some(e);
                wait_for_request(shutdown_rx).await;
            }
            Startup::Interrupted => {
                warn!("Lifecycle: shutdown requested before subsystem finished starting, startup aborted");
            }
        }

        self.transition(LifecyclePhase::ShuttingDown);
        info!("Lifecycle: stopping subsystem");
        let stop_clock = Instant::now();
        let stopped = self.subsystem.stop().await;
        let elapsed = stop_clock.elapsed().as_secs_f64();

        let code = match stopped {
            Ok(()) => failure.map_or(EXIT_CLEAN, |e| e.exit_code()),
            Err(e) => {
                error!(
                    reason = e.reason(),
                    exit_code = e.exit_code(),
                    duration_secs = elapsed,
                    "Lifecycle: subsystem failed to stop cleanly"
                );
                e.exit_code()
            }
        };
        // Labelled by the reported code, so a failed start is not counted as clean.
        let result = if code == EXIT_CLEAN { "clean" } else { "failed" };
        metrics::emit_subsystem_stop_duration(&self.name, result, elapsed);

        self.transition(LifecyclePhase::Terminated);
        info!(
            exit_code = code,
            duration_secs = elapsed,
            "Lifecycle: subsystem stopped"
        );
        code
    }

    fn transition(&self, phase: LifecyclePhase) {
        let previous = self.phase_tx.send_replace(phase);
        debug!(from = ?previous, to = ?phase, "Lifecycle: phase transition");
    }
}

async fn wait_for_request(shutdown_rx: oneshot::Receiver<ShutdownRequest>) {
    if shutdown_rx.await.is_err() {
        warn!("Lifecycle: shutdown requester dropped, stopping subsystem");
    }
}
