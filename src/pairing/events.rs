//! Pairing lifecycle events and the sinks that carry them to a UI layer.
//!
//! Events are observability signals, not part of the admission contract.
//! Emission is one-way and best-effort: no buffering, no retries, no
//! delivery guarantee. A successful run emits
//! `ConnectionSuccess -> TransferSuccess -> Success`; a failing phase emits
//! its error event and nothing after it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::error::{EmitError, PhaseError};
use crate::pairing::transport::Phase;

/// Closed set of pairing lifecycle markers.
///
/// Serializes as `{"type": "<tag>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PairingEvent {
    ConnectionError,
    ConnectionSuccess,
    TransferError,
    TransferSuccess,
    DecryptionError,
    InstallationError,
    Success,
}

impl PairingEvent {
    pub const ALL: [PairingEvent; 7] = [
        PairingEvent::ConnectionError,
        PairingEvent::ConnectionSuccess,
        PairingEvent::TransferError,
        PairingEvent::TransferSuccess,
        PairingEvent::DecryptionError,
        PairingEvent::InstallationError,
        PairingEvent::Success,
    ];

    /// Wire tag, as it appears in the `type` field.
    pub fn tag(self) -> &'static str {
        match self {
            Self::ConnectionError => "connection-error",
            Self::ConnectionSuccess => "connection-success",
            Self::TransferError => "transfer-error",
            Self::TransferSuccess => "transfer-success",
            Self::DecryptionError => "decryption-error",
            Self::InstallationError => "installation-error",
            Self::Success => "success",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::ConnectionError
                | Self::TransferError
                | Self::DecryptionError
                | Self::InstallationError
        )
    }

    /// JSON signal string for transport to the UI.
    pub fn to_signal(self) -> String {
        format!(r#"{{"type":"{}"}}"#, self.tag())
    }
}

impl std::fmt::Display for PairingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl From<&PhaseError> for PairingEvent {
    fn from(err: &PhaseError) -> Self {
        match err {
            PhaseError::Connection(_) => Self::ConnectionError,
            PhaseError::Transfer(_) => Self::TransferError,
            PhaseError::Decryption(_) => Self::DecryptionError,
            PhaseError::Installation(_) => Self::InstallationError,
            PhaseError::Timeout { phase, .. } => match phase {
                Phase::Connect => Self::ConnectionError,
                Phase::Transfer => Self::TransferError,
                Phase::Install => Self::InstallationError,
            },
        }
    }
}

/// Destination for pairing events (a UI bridge, a log, a test harness).
///
/// Must not block: the orchestrator calls it inline between phases.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, event: PairingEvent) -> Result<(), EmitError>;
}

/// Single-consumer sink backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PairingEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<PairingEvent>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving half.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PairingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: PairingEvent) -> Result<(), EmitError> {
        self.tx.send(event).map_err(|_| EmitError::ReceiverClosed)
    }
}

/// Fan-out sink; each subscriber gets its own copy.
///
/// Slow subscribers lag and lose events rather than holding up the sender.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<PairingEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PairingEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: PairingEvent) -> Result<(), EmitError> {
        self.tx
            .send(event)
            .map(|_| ())
            .map_err(|_| EmitError::NoSubscribers)
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: PairingEvent) -> Result<(), EmitError> {
        Ok(())
    }
}

/// Fire-and-forget front for an [`EventSink`].
#[derive(Clone)]
pub struct EventEmitter {
    sink: Arc<dyn EventSink>,
}

impl EventEmitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn null() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Hand `event` to the sink. Failures are logged and dropped.
    pub fn emit(&self, event: PairingEvent) {
        if let Err(e) = self.sink.emit(event) {
            tracing::debug!(event = %event, error = %e, "Dropped pairing event");
        }
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_event_serializes_as_type_tag() {
        for event in PairingEvent::ALL {
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, event.to_signal());

            let back: PairingEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(back, event);
        }
        assert_eq!(
            PairingEvent::ConnectionSuccess.to_signal(),
            r#"{"type":"connection-success"}"#
        );
    }

    #[test]
    fn test_error_classification() {
        let errors: Vec<_> = PairingEvent::ALL.iter().filter(|e| e.is_error()).collect();
        assert_eq!(errors.len(), 4);
        assert!(!PairingEvent::Success.is_error());
        assert!(!PairingEvent::TransferSuccess.is_error());
    }

    #[test]
    fn test_phase_error_maps_to_event() {
        assert_eq!(
            PairingEvent::from(&PhaseError::Decryption("bad key".into())),
            PairingEvent::DecryptionError
        );
        assert_eq!(
            PairingEvent::from(&PhaseError::Timeout {
                phase: Phase::Connect,
                timeout: Duration::from_secs(1),
            }),
            PairingEvent::ConnectionError
        );
        assert_eq!(
            PairingEvent::from(&PhaseError::Timeout {
                phase: Phase::Install,
                timeout: Duration::from_secs(1),
            }),
            PairingEvent::InstallationError
        );
        assert_eq!(
            PairingEvent::from(&PhaseError::Timeout {
                phase: Phase::Transfer,
                timeout: Duration::from_secs(1),
            }),
            PairingEvent::TransferError
        );
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::channel();
        let emitter = EventEmitter::new(Arc::new(sink));
        emitter.emit(PairingEvent::ConnectionSuccess);
        emitter.emit(PairingEvent::TransferSuccess);

        assert_eq!(rx.recv().await, Some(PairingEvent::ConnectionSuccess));
        assert_eq!(rx.recv().await, Some(PairingEvent::TransferSuccess));
    }

    #[test]
    fn test_closed_channel_is_not_fatal() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        assert_eq!(
            sink.emit(PairingEvent::Success),
            Err(EmitError::ReceiverClosed)
        );
        EventEmitter::new(Arc::new(sink)).emit(PairingEvent::Success);
    }

    #[tokio::test]
    async fn test_broadcast_sink_fans_out() {
        let sink = BroadcastSink::new(8);
        let mut first = sink.subscribe();
        let mut second = sink.subscribe();

        sink.emit(PairingEvent::Success).unwrap();
        assert_eq!(first.recv().await.unwrap(), PairingEvent::Success);
        assert_eq!(second.recv().await.unwrap(), PairingEvent::Success);
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let sink = BroadcastSink::new(8);
        assert_eq!(
            sink.emit(PairingEvent::Success),
            Err(EmitError::NoSubscribers)
        );
    }
}
