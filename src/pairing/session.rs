//! Admission control for pairing attempts.
//!
//! At most one attempt holds the slot at a time, across all tokens. The
//! controller also remembers how each token's last attempt ended:
//!
//! ```text
//! start_pairing(t)   slot busy                -> AlreadyPairing
//!                    outcome[t] == Success    -> AlreadyPaired(t)
//!                    otherwise                -> slot = Pairing(t)
//! stop_pairing(t, e) outcome[t] = e.is_none() ? Success : Failure(e)
//!                    slot = Idle (only if it held t, or was already idle)
//! ```
//!
//! Every admission gets a fresh generation number. A `PairingLease` only
//! stops the admission it was issued for, so a lease outliving an external
//! stop cannot free the slot of a later attempt with the same token.
//!
//! All of this lives in memory. A restart forgets every outcome, so tokens
//! that succeeded before become usable again.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::PairingError;
use crate::pairing::token::ConnectionToken;

/// Failure message recorded when a lease is dropped without completing.
pub const ABANDONED_MESSAGE: &str = "pairing attempt abandoned";

/// The single system-wide pairing slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "token", rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Pairing(ConnectionToken),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn active_token(&self) -> Option<&ConnectionToken> {
        match self {
            Self::Idle => None,
            Self::Pairing(token) => Some(token),
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Pairing(token) => write!(f, "pairing({})", token),
        }
    }
}

/// Terminal result of the last attempt made with a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "error", rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// An outcome plus when it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    /// How the attempt ended.
    pub outcome: Outcome,
    /// When the outcome was stored.
    pub recorded_at: DateTime<Utc>,
}

/// What a `stop_pairing` call did to the slot.
///
/// Purely informational; stopping never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// The slot held this token and is now idle.
    Released,
    /// Nothing was pairing. The outcome was still recorded.
    AlreadyIdle,
    /// Another token holds the slot; it was left in place.
    Mismatched { active: ConnectionToken },
    /// The lease's admission was already stopped. Nothing was recorded.
    Stale,
}

struct Inner {
    state: SessionState,
    /// Generation of the latest admission. Only meaningful while pairing.
    generation: u64,
    outcomes: HashMap<ConnectionToken, OutcomeRecord>,
    /// Tokens whose current outcome is a failure, oldest first. Only kept
    /// when failures are capped.
    failure_order: VecDeque<ConnectionToken>,
}

impl Inner {
    /// Store `outcome` and return any failure entries evicted to make room.
    fn record(
        &mut self,
        token: &ConnectionToken,
        outcome: Outcome,
        max_failures: Option<usize>,
    ) -> Vec<ConnectionToken> {
        let is_failure = !outcome.is_success();
        self.outcomes.insert(
            token.clone(),
            OutcomeRecord {
                outcome,
                recorded_at: Utc::now(),
            },
        );

        let mut evicted = Vec::new();
        let Some(max) = max_failures else {
            return evicted;
        };

        if let Some(pos) = self.failure_order.iter().position(|t| t == token) {
            self.failure_order.remove(pos);
        }
        if !is_failure {
            return evicted;
        }
        self.failure_order.push_back(token.clone());

        // Absent and Failure admit identically, so dropping failures is safe.
        // Successes are never evicted.
        while self.failure_order.len() > max {
            let Some(oldest) = self.failure_order.pop_front() else {
                break;
            };
            self.outcomes.remove(&oldest);
            evicted.push(oldest);
        }
        evicted
    }

    /// Whether the slot is still held by admission `generation` of `token`.
    fn holds(&self, token: &ConnectionToken, generation: u64) -> bool {
        self.generation == generation && self.state.active_token() == Some(token)
    }
}

/// Owns the active-session slot and the outcome memory.
///
/// Shared by handle (`Arc<SessionController>`). Every method takes the one
/// lock for a short in-memory critical section and never blocks on I/O.
pub struct SessionController {
    inner: Mutex<Inner>,
    /// Cap on remembered failure outcomes. `None` keeps everything.
    max_failed_outcomes: Option<usize>,
}

impl SessionController {
    /// Create an idle controller that remembers every outcome.
    pub fn new() -> Self {
        Self::with_failure_limit(None)
    }

    /// Create an idle controller keeping at most `max` failure outcomes.
    pub fn with_failure_limit(max: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                generation: 0,
                outcomes: HashMap::new(),
                failure_order: VecDeque::new(),
            }),
            max_failed_outcomes: max,
        }
    }

    /// Claim the slot for `token`.
    pub fn start_pairing(&self, token: &ConnectionToken) -> Result<(), PairingError> {
        self.admit(token).map(|_| ())
    }

    /// Claim the slot and return the generation of this admission.
    fn admit(&self, token: &ConnectionToken) -> Result<u64, PairingError> {
        let mut inner = self.inner.lock();
        let busy_with = inner.state.active_token().cloned();
        let already_paired = inner
            .outcomes
            .get(token)
            .is_some_and(|record| record.outcome.is_success());
        if busy_with.is_none() && !already_paired {
            inner.state = SessionState::Pairing(token.clone());
            inner.generation += 1;
        }
        let generation = inner.generation;
        drop(inner);

        if let Some(active) = busy_with {
            tracing::debug!(token = %token, active = %active, "Pairing rejected, slot busy");
            return Err(PairingError::AlreadyPairing);
        }
        if already_paired {
            tracing::debug!(token = %token, "Pairing rejected, token already paired");
            return Err(PairingError::AlreadyPaired {
                token: token.clone(),
            });
        }

        tracing::info!(token = %token, generation, "Pairing session started");
        Ok(generation)
    }

    /// Record how the attempt for `token` ended and free the slot.
    ///
    /// `error` of `None` means success. A stop for a token other than the
    /// active one records its outcome but leaves the active session alone.
    pub fn stop_pairing(&self, token: &ConnectionToken, error: Option<String>) -> Release {
        self.stop(token, error, None)
    }

    /// `stop_pairing`, optionally scoped to one admission. A scoped stop
    /// whose admission no longer holds the slot changes nothing.
    fn stop(
        &self,
        token: &ConnectionToken,
        error: Option<String>,
        generation: Option<u64>,
    ) -> Release {
        let succeeded = error.is_none();
        let outcome = match error {
            None => Outcome::Success,
            Some(message) => Outcome::Failure(message),
        };

        let mut inner = self.inner.lock();
        if generation.is_some_and(|g| !inner.holds(token, g)) {
            drop(inner);
            tracing::debug!(token = %token, "Lease outlived its session, nothing to stop");
            return Release::Stale;
        }
        let evicted = inner.record(token, outcome, self.max_failed_outcomes);

        let release = match inner.state.active_token() {
            None => Release::AlreadyIdle,
            Some(active) if active == token => Release::Released,
            Some(active) => Release::Mismatched {
                active: active.clone(),
            },
        };
        if release == Release::Released {
            inner.state = SessionState::Idle;
        }
        drop(inner);

        for old in &evicted {
            tracing::debug!(token = %old, "Evicted oldest failed pairing outcome");
        }
        match &release {
            Release::Released => {
                tracing::info!(token = %token, success = succeeded, "Pairing session stopped");
            }
            Release::AlreadyIdle => {
                tracing::debug!(token = %token, success = succeeded, "Outcome recorded while idle");
            }
            Release::Mismatched { active } => {
                tracing::warn!(
                    token = %token,
                    active = %active,
                    "Stop for a token that does not hold the slot, leaving active session in place"
                );
            }
            Release::Stale => {}
        }
        release
    }

    /// `start_pairing` wrapped in a lease that always releases the slot.
    pub fn try_acquire(
        self: &Arc<Self>,
        token: ConnectionToken,
    ) -> Result<PairingLease, PairingError> {
        let generation = self.admit(&token)?;
        Ok(PairingLease {
            controller: Arc::clone(self),
            token,
            generation,
            completed: false,
        })
    }

    /// Snapshot of the slot.
    pub fn state(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn is_pairing(&self) -> bool {
        !self.inner.lock().state.is_idle()
    }

    /// Last recorded outcome for `token`, if still remembered.
    pub fn outcome(&self, token: &ConnectionToken) -> Option<OutcomeRecord> {
        self.inner.lock().outcomes.get(token).cloned()
    }

    pub fn outcome_count(&self) -> usize {
        self.inner.lock().outcomes.len()
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SessionController")
            .field("state", &inner.state)
            .field("outcomes", &inner.outcomes.len())
            .field("max_failed_outcomes", &self.max_failed_outcomes)
            .finish()
    }
}

/// Proof that the holder owns the pairing slot.
///
/// `complete` stops the session exactly once. Dropping an uncompleted lease
/// (early return, panic, aborted task) records a failure and frees the slot.
/// If the session was already stopped through `stop_pairing`, neither does
/// anything and the outcome recorded by that stop stands.
#[derive(Debug)]
pub struct PairingLease {
    controller: Arc<SessionController>,
    token: ConnectionToken,
    generation: u64,
    completed: bool,
}

impl PairingLease {
    pub fn token(&self) -> &ConnectionToken {
        &self.token
    }

    /// Finish the attempt. `None` records success.
    pub fn complete(mut self, error: Option<String>) -> Release {
        self.completed = true;
        self.controller
            .stop(&self.token, error, Some(self.generation))
    }
}

impl Drop for PairingLease {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        tracing::warn!(token = %self.token, "Pairing lease dropped before completion");
        self.controller.stop(
            &self.token,
            Some(ABANDONED_MESSAGE.to_string()),
            Some(self.generation),
        );
    }
}
