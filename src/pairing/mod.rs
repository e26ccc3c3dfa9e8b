//! Local device pairing.
//!
//! One pairing attempt may run at a time across the whole process. The
//! [`SessionController`] admits attempts and remembers how each token's last
//! attempt ended; [`PairingApi`] drives an admitted attempt through its
//! phases and reports progress as [`PairingEvent`]s.

pub mod events;
pub mod orchestrator;
pub mod session;
pub mod simulated;
pub mod token;
pub mod transport;

pub use events::{BroadcastSink, ChannelSink, EventEmitter, EventSink, NullSink, PairingEvent};
pub use orchestrator::{AttemptReport, PairingApi, PairingHandle};
pub use session::{Outcome, OutcomeRecord, PairingLease, Release, SessionController, SessionState};
pub use simulated::{FailurePoint, SimulatedTransport};
pub use token::ConnectionToken;
pub use transport::{PairingRequest, PairingTransport, Phase};
