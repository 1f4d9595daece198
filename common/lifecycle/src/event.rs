//! Termination events and the stream that carries them to the coordinator.

use std::fmt;

use tokio::sync::mpsc;

/// Default capacity of the termination event stream.
pub const DEFAULT_EVENT_BUFFER: usize = 8;

/// Why shutdown was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerminationEvent {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Synthetic event injected by the [`TestModeTimer`](crate::TestModeTimer).
    TestTrigger,
}

impl TerminationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationEvent::Interrupt => "SIGINT",
            TerminationEvent::Terminate => "SIGTERM",
            TerminationEvent::TestTrigger => "test-timer",
        }
    }
}

impl fmt::Display for TerminationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Producer side of the event stream. Cloned into every event source.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::Sender<TerminationEvent>,
}

impl EventSender {
    /// Queue an event, waiting for buffer space. Returns false once the reader is gone.
    pub async fn send(&self, event: TerminationEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// Reader side of the event stream; owned by the coordinator.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<TerminationEvent>,
}

impl EventStream {
    /// Next event in arrival order; `None` when every sender has been dropped.
    pub async fn recv(&mut self) -> Option<TerminationEvent> {
        self.rx.recv().await
    }
}

/// Create a bounded event stream. A zero buffer is raised to one so the first
/// notification is never lost while the reader is busy.
pub fn event_channel(buffer: usize) -> (EventSender, EventStream) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (EventSender { tx }, EventStream { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_signal() {
        assert_eq!(TerminationEvent::Interrupt.to_string(), "SIGINT");
        assert_eq!(TerminationEvent::Terminate.to_string(), "SIGTERM");
        assert_eq!(TerminationEvent::TestTrigger.to_string(), "test-timer");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_buffer_still_holds_one_event() {
        let (tx, mut rx) = event_channel(0);
        assert!(tx.send(TerminationEvent::Interrupt).await);

        let full = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            tx.send(TerminationEvent::Terminate),
        )
        .await;
        assert!(full.is_err(), "second event should wait for buffer space");

        assert_eq!(rx.recv().await, Some(TerminationEvent::Interrupt));
    }

    #[tokio::test]
    async fn events_arrive_in_send_order() {
        let (tx, mut rx) = event_channel(DEFAULT_EVENT_BUFFER);
        assert!(tx.send(TerminationEvent::Terminate).await);
        assert!(tx.send(TerminationEvent::Interrupt).await);
        drop(tx);
        assert_eq!(rx.recv().await, Some(TerminationEvent::Terminate));
        assert_eq!(rx.recv().await, Some(TerminationEvent::Interrupt));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn send_fails_once_reader_dropped() {
        let (tx, rx) = event_channel(1);
        drop(rx);
        assert!(!tx.send(TerminationEvent::Interrupt).await);
    }
}
