//! Exit coordinator: first termination event means graceful shutdown, a second one means forced exit.

use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn, Instrument};

use crate::error::LifecycleError;
use crate::event::{event_channel, EventSender, EventStream, TerminationEvent, DEFAULT_EVENT_BUFFER};
use crate::manager::{LifecycleManager, ShutdownRequest, Subsystem};
use crate::metrics;
use crate::signals::SignalWatcher;
use crate::test_mode::TestModeTimer;
use crate::EXIT_FORCED;

/// Options for building an [`ExitCoordinator`].
#[derive(Clone, Debug)]
pub struct CoordinatorOptions {
    pub name: String,
    /// Install SIGINT/SIGTERM handlers (default: true).
    pub trap_signals: bool,
    /// When set, inject a synthetic termination event after this delay (default: off).
    pub test_mode_delay: Option<Duration>,
    /// Capacity of the termination event stream, at least one.
    pub event_buffer: usize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            trap_signals: true,
            test_mode_delay: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

pub struct CoordinatorBuilder {
    options: CoordinatorOptions,
}

impl CoordinatorBuilder {
    pub fn with_trap_signals(mut self, trap: bool) -> Self {
        self.options.trap_signals = trap;
        self
    }

    /// Enable test mode: the process stops itself after `delay`.
    pub fn with_test_mode(mut self, delay: Duration) -> Self {
        self.options.test_mode_delay = Some(delay);
        self
    }

    pub fn with_event_buffer(mut self, buffer: usize) -> Self {
        self.options.event_buffer = buffer;
        self
    }

    pub fn build(self) -> ExitCoordinator {
        ExitCoordinator::new(self.options)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinatorState {
    WaitingForFirstSignal,
    GracefulShutdownInProgress,
    Done,
}

/// How the process should end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The subsystem stopped and reported this code.
    Graceful(i32),
    /// A repeated termination event cut graceful shutdown short.
    Forced(TerminationEvent),
}

impl Termination {
    pub fn exit_code(&self) -> i32 {
        match self {
            Termination::Graceful(code) => *code,
            Termination::Forced(_) => EXIT_FORCED,
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, Termination::Forced(_))
    }

    /// Terminate the process immediately; nothing else gets a chance to clean up.
    pub fn exit(self) -> ! {
        std::process::exit(self.exit_code())
    }
}

/// Top-level loop wiring signals, the test timer and the [`LifecycleManager`] together.
pub struct ExitCoordinator {
    options: CoordinatorOptions,
    events_tx: EventSender,
    events: EventStream,
    state_tx: watch::Sender<CoordinatorState>,
}

impl ExitCoordinator {
    pub fn builder(name: &str) -> CoordinatorBuilder {
        CoordinatorBuilder {
            options: CoordinatorOptions {
                name: name.to_string(),
                ..CoordinatorOptions::default()
            },
        }
    }

    pub fn new(options: CoordinatorOptions) -> Self {
        let (events_tx, events) = event_channel(options.event_buffer);
        let (state_tx, _) = watch::channel(CoordinatorState::WaitingForFirstSignal);
        Self {
            options,
            events_tx,
            events,
            state_tx,
        }
    }

    /// Another producer for the termination event stream.
    pub fn event_sender(&self) -> EventSender {
        self.events_tx.clone()
    }

    /// Observe state transitions. Subscribe before calling [`run`](ExitCoordinator::run).
    pub fn state(&self) -> watch::Receiver<CoordinatorState> {
        self.state_tx.subscribe()
    }

    /// Start the manager, wait for termination events and decide how the process ends.
    /// The caller is expected to act on the result right away, usually via
    /// [`Termination::exit`].
    pub async fn run<S: Subsystem>(
        self,
        manager: LifecycleManager<S>,
    ) -> Result<Termination, LifecycleError> {
        let span = tracing::info_span!("lifecycle", app = %self.options.name);
        self.run_inner(manager).instrument(span).await
    }

    async fn run_inner<S: Subsystem>(
        mut self,
        manager: LifecycleManager<S>,
    ) -> Result<Termination, LifecycleError> {
        let name = self.options.name.clone();
        info!("Lifecycle: {name} starting");

        if self.options.trap_signals {
            SignalWatcher::install()?.spawn(self.events_tx.clone());
        }
        if let Some(delay) = self.options.test_mode_delay {
            TestModeTimer::new(delay).spawn(self.events_tx.clone());
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let mut exit_rx = manager.start(shutdown_rx);

        // WaitingForFirstSignal. The coordinator holds a sender itself, so the
        // stream never reports closed here.
        let first = tokio::select! {
            Some(event) = self.events.recv() => event,
            code = &mut exit_rx => {
                // Only reachable if the manager task died: it never reports before a request.
                return self.finish_without_request(code);
            }
        };

        metrics::emit_termination_event(&name, first.as_str(), false);
        info!(signal = %first, "Lifecycle: caught signal: {first}");
        if shutdown_tx.send(ShutdownRequest).is_err() {
            debug!("Lifecycle: manager already gone, shutdown request not delivered");
        }
        self.transition(CoordinatorState::GracefulShutdownInProgress);

        // Best-effort escalation: whichever of a second event and the exit code is
        // observed first decides the outcome.
        let termination = tokio::select! {
            code = &mut exit_rx => match code {
                Ok(code) => {
                    info!(exit_code = code, "Lifecycle: graceful shutdown complete");
                    Termination::Graceful(code)
                }
                Err(_) => {
                    self.transition(CoordinatorState::Done);
                    return Err(LifecycleError::ManagerVanished);
                }
            },
            Some(event) = self.events.recv() => {
                metrics::emit_termination_event(&name, event.as_str(), true);
                warn!(signal = %event, "Lifecycle: caught signal: {event}, force halting now!");
                Termination::Forced(event)
            }
        };

        self.transition(CoordinatorState::Done);
        metrics::emit_shutdown_completed(
            &name,
            if termination.is_forced() { "forced" } else { "graceful" },
        );
        Ok(termination)
    }

    fn finish_without_request(
        &self,
        code: Result<i32, oneshot::error::RecvError>,
    ) -> Result<Termination, LifecycleError> {
        self.transition(CoordinatorState::Done);
        match code {
            Ok(code) => {
                warn!(
                    exit_code = code,
                    "Lifecycle: subsystem stopped without a shutdown request"
                );
                Ok(Termination::Graceful(code))
            }
            Err(_) => Err(LifecycleError::ManagerVanished),
        }
    }

    fn transition(&self, state: CoordinatorState) {
        let previous = self.state_tx.send_replace(state);
        debug!(from = ?previous, to = ?state, "Lifecycle: coordinator transition");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_termination_exits_abnormally() {
        let t = Termination::Forced(TerminationEvent::Interrupt);
        assert!(t.is_forced());
        assert_eq!(t.exit_code(), EXIT_FORCED);
    }

    #[test]
    fn graceful_termination_keeps_subsystem_code() {
        assert_eq!(Termination::Graceful(0).exit_code(), 0);
        assert_eq!(Termination::Graceful(2).exit_code(), 2);
        assert!(!Termination::Graceful(0).is_forced());
    }

    #[test]
    fn builder_applies_options() {
        let coordinator = ExitCoordinator::builder("wavepipe")
            .with_trap_signals(false)
            .with_test_mode(Duration::from_secs(3))
            .with_event_buffer(0)
            .build();
        assert_eq!(coordinator.options.name, "wavepipe");
        assert!(!coordinator.options.trap_signals);
        assert_eq!(
            coordinator.options.test_mode_delay,
            Some(Duration::from_secs(3))
        );
        assert_eq!(
            *coordinator.state().borrow(),
            CoordinatorState::WaitingForFirstSignal
        );
    }
}
