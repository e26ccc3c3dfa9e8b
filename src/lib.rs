//! pairctl: admission control and lifecycle events for local device pairing.
//!
//! At most one pairing attempt runs per process. Every connection token's
//! last outcome is remembered: failed tokens may be retried, a token that
//! paired successfully is refused from then on.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pairctl::pairing::{
//!     ChannelSink, EventEmitter, PairingApi, PairingRequest, SessionController,
//!     SimulatedTransport,
//! };
//!
//! # async fn demo() -> pairctl::error::Result<()> {
//! let (sink, mut events) = ChannelSink::channel();
//! let api = PairingApi::new(
//!     Arc::new(SessionController::new()),
//!     EventEmitter::new(Arc::new(sink)),
//!     Arc::new(SimulatedTransport::default()),
//! );
//! let handle = api.start(PairingRequest::new("token-from-qr"))?;
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.to_signal());
//! }
//! # drop(handle);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pairing;
pub mod version;

pub use error::{Error, PairingError, Result};
pub use pairing::{ConnectionToken, PairingApi, PairingEvent, SessionController};
