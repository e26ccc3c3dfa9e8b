//! Runs one pairing attempt end to end.
//!
//! `PairingApi::start` validates, claims the slot and returns. The phases run
//! in a spawned task and are observable only through events:
//!
//! ```text
//! start(request) --> validate --> try_acquire --> spawn ----------> handle
//!                                                   |
//!                      connect --ok--> ConnectionSuccess
//!                      transfer --ok--> TransferSuccess
//!                      install --ok--> release(Success) --> Success
//!                      any phase --err--> release(Failure) --> *Error
//! ```
//!
//! The slot is released before the terminal event goes out, so an observer
//! reacting to it can start the next attempt straight away. The lease held
//! by the task releases the slot even if the task is aborted or panics.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::PairingConfig;
use crate::error::{PairingError, PhaseError, Result};
use crate::pairing::events::{EventEmitter, PairingEvent};
use crate::pairing::session::{PairingLease, SessionController};
use crate::pairing::token::ConnectionToken;
use crate::pairing::transport::{PairingRequest, PairingTransport, Phase};

/// Default upper bound on a single phase.
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure recorded for an attempt cancelled through its handle.
pub const CANCELLED_MESSAGE: &str = "pairing cancelled";

/// How an attempt ended, as seen by its supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptReport {
    Paired,
    Failed(PhaseError),
    Cancelled,
    /// The task panicked or was aborted; the lease recorded a failure.
    Aborted(String),
}

impl AttemptReport {
    pub fn is_paired(&self) -> bool {
        matches!(self, Self::Paired)
    }
}

/// Supervision handle for a running attempt.
#[derive(Debug)]
pub struct PairingHandle {
    token: ConnectionToken,
    cancel: Arc<Notify>,
    join: JoinHandle<AttemptReport>,
}

impl PairingHandle {
    pub fn token(&self) -> &ConnectionToken {
        &self.token
    }

    /// Ask the attempt to stop. The current phase is dropped and a failure
    /// is recorded for the token.
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the attempt to end.
    pub async fn wait(self) -> AttemptReport {
        match self.join.await {
            Ok(report) => report,
            Err(e) => AttemptReport::Aborted(e.to_string()),
        }
    }
}

/// Entry point for pairing attempts.
#[derive(Clone)]
pub struct PairingApi {
    sessions: Arc<SessionController>,
    emitter: EventEmitter,
    transport: Arc<dyn PairingTransport>,
    phase_timeout: Duration,
}

impl PairingApi {
    pub fn new(
        sessions: Arc<SessionController>,
        emitter: EventEmitter,
        transport: Arc<dyn PairingTransport>,
    ) -> Self {
        Self {
            sessions,
            emitter,
            transport,
            phase_timeout: DEFAULT_PHASE_TIMEOUT,
        }
    }

    /// Build the controller and API from configuration.
    pub fn from_config(
        config: &PairingConfig,
        emitter: EventEmitter,
        transport: Arc<dyn PairingTransport>,
    ) -> Self {
        let sessions = Arc::new(SessionController::with_failure_limit(
            config.max_failed_outcomes,
        ));
        Self::new(sessions, emitter, transport).with_phase_timeout(config.phase_timeout)
    }

    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionController> {
        &self.sessions
    }

    /// Validate `request`, claim the slot and launch the attempt.
    ///
    /// Returns once the task is spawned. Fails with `AlreadyPairing` or
    /// `AlreadyPaired` exactly as the controller does, and with a version
    /// error for tags this build does not know.
    pub fn start(&self, request: PairingRequest) -> Result<PairingHandle> {
        if request.token.is_empty() {
            return Err(PairingError::EmptyToken.into());
        }
        let versions = request.versions()?;
        let lease = self.sessions.try_acquire(request.token.clone())?;
        let token = request.token.clone();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                let reason = e.to_string();
                lease.complete(Some(reason.clone()));
                return Err(PairingError::Launch { token, reason }.into());
            }
        };

        tracing::info!(
            token = %token,
            connection_version = versions.connection.tag(),
            pairing_version = versions.pairing.tag(),
            "Launching pairing attempt"
        );

        let cancel = Arc::new(Notify::new());
        let attempt = Attempt {
            request,
            emitter: self.emitter.clone(),
            transport: Arc::clone(&self.transport),
            phase_timeout: self.phase_timeout,
        };
        let join = runtime.spawn(attempt.run(lease, Arc::clone(&cancel)));

        Ok(PairingHandle {
            token,
            cancel,
            join,
        })
    }
}

impl std::fmt::Debug for PairingApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingApi")
            .field("sessions", &self.sessions)
            .field("phase_timeout", &self.phase_timeout)
            .finish_non_exhaustive()
    }
}

/// Everything the spawned task owns.
struct Attempt {
    request: PairingRequest,
    emitter: EventEmitter,
    transport: Arc<dyn PairingTransport>,
    phase_timeout: Duration,
}

impl Attempt {
    async fn run(self, lease: PairingLease, cancel: Arc<Notify>) -> AttemptReport {
        let result = tokio::select! {
            result = self.drive() => Some(result),
            _ = cancel.notified() => None,
        };

        match result {
            Some(Ok(())) => {
                lease.complete(None);
                self.emitter.emit(PairingEvent::Success);
                AttemptReport::Paired
            }
            Some(Err(e)) => {
                tracing::warn!(token = %self.request.token, error = %e, "Pairing attempt failed");
                lease.complete(Some(e.to_string()));
                self.emitter.emit(PairingEvent::from(&e));
                AttemptReport::Failed(e)
            }
            None => {
                tracing::info!(token = %self.request.token, "Pairing attempt cancelled");
                lease.complete(Some(CANCELLED_MESSAGE.to_string()));
                AttemptReport::Cancelled
            }
        }
    }

    /// Connect, transfer, install. Stops at the first failing phase.
    async fn drive(&self) -> std::result::Result<(), PhaseError> {
        self.phase(Phase::Connect, self.transport.connect(&self.request))
            .await?;
        self.emitter.emit(PairingEvent::ConnectionSuccess);

        let payload = self
            .phase(Phase::Transfer, self.transport.transfer(&self.request))
            .await?;
        self.emitter.emit(PairingEvent::TransferSuccess);

        self.phase(Phase::Install, self.transport.install(&self.request, payload))
            .await
    }

    async fn phase<T>(
        &self,
        phase: Phase,
        fut: impl Future<Output = std::result::Result<T, PhaseError>>,
    ) -> std::result::Result<T, PhaseError> {
        tracing::debug!(token = %self.request.token, phase = %phase, "Pairing phase started");
        match tokio::time::timeout(self.phase_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PhaseError::Timeout {
                phase,
                timeout: self.phase_timeout,
            }),
        }
    }
}
