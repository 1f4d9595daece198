//! Process lifecycle: OS signal trapping, an optional self-terminating test timer,
//! a manager that starts and stops one background subsystem, and an exit coordinator
//! that turns the first termination signal into a graceful shutdown and a repeated
//! signal into a forced exit. All parts talk over channels; nothing is shared.

mod coordinator;
mod error;
mod event;
mod manager;
mod metrics;
mod signals;
mod test_mode;

pub use coordinator::{
    CoordinatorBuilder, CoordinatorOptions, CoordinatorState, ExitCoordinator, Termination,
};
pub use error::{LifecycleError, SubsystemError};
pub use event::{event_channel, EventSender, EventStream, TerminationEvent, DEFAULT_EVENT_BUFFER};
pub use manager::{LifecycleManager, LifecyclePhase, ShutdownRequest, Subsystem};
pub use signals::SignalWatcher;
pub use test_mode::{TestModeTimer, DEFAULT_TEST_MODE_DELAY};

/// Exit status for a subsystem that stopped cleanly.
pub const EXIT_CLEAN: i32 = 0;
/// Exit status when a repeated termination signal preempts graceful shutdown.
pub const EXIT_FORCED: i32 = 1;
/// Default exit status for a subsystem that failed to start or stop.
pub const EXIT_SUBSYSTEM_FAILURE: i32 = 2;
