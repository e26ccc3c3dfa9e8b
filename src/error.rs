//! Error types for pairctl.

use std::time::Duration;

use crate::pairing::token::ConnectionToken;
use crate::pairing::transport::Phase;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pairing error: {0}")]
    Pairing(#[from] PairingError),

    #[error("Version error: {0}")]
    Version(#[from] VersionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Admission and orchestration errors for a pairing attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    /// Another attempt holds the slot. Retry once it frees.
    #[error("A pairing session is already in progress")]
    AlreadyPairing,

    /// The token completed successfully before and can never be reused.
    #[error("Connection token already paired: {token}")]
    AlreadyPaired { token: ConnectionToken },

    #[error("Connection token must not be empty")]
    EmptyToken,

    #[error("Failed to launch pairing task for {token}: {reason}")]
    Launch {
        token: ConnectionToken,
        reason: String,
    },
}

impl PairingError {
    /// Whether retrying the same token later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AlreadyPairing | Self::Launch { .. })
    }
}

/// Unrecognized version tags declared by a remote peer or a token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("Unsupported connection token version: {0}")]
    UnsupportedConnectionVersion(u8),

    #[error("Unsupported pairing protocol version: {0}")]
    UnsupportedPairingVersion(u8),
}

/// Failure to hand an event to a sink. Logged by the emitter, never
/// propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("Event receiver closed")]
    ReceiverClosed,

    #[error("No active subscribers")]
    NoSubscribers,
}

/// A pairing phase failed. Produced by transports and by the orchestrator
/// when a phase overruns its timeout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Installation failed: {0}")]
    Installation(String),

    #[error("Phase {phase} timed out after {timeout:?}")]
    Timeout { phase: Phase, timeout: Duration },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_pairing_display() {
        let err = PairingError::AlreadyPairing;
        assert!(err.to_string().contains("already in progress"));
    }

    #[test]
    fn test_already_paired_carries_token() {
        let err = PairingError::AlreadyPaired {
            token: ConnectionToken::from("cs2:abc"),
        };
        assert!(err.to_string().contains("cs2:abc"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PairingError::AlreadyPairing.is_retryable());
        assert!(
            !PairingError::AlreadyPaired {
                token: ConnectionToken::from("t"),
            }
            .is_retryable()
        );
        assert!(!PairingError::EmptyToken.is_retryable());
    }

    #[test]
    fn test_phase_timeout_display() {
        let err = PhaseError::Timeout {
            phase: Phase::Transfer,
            timeout: Duration::from_secs(30),
        };
        let msg = err.to_string();
        assert!(msg.contains("transfer"));
        assert!(msg.contains("30"));
    }

    #[test]
    fn test_version_error_display() {
        let err = VersionError::UnsupportedPairingVersion(9);
        assert!(err.to_string().contains('9'));
    }

    #[test]
    fn test_config_invalid_value_display() {
        let err = ConfigError::InvalidValue {
            key: "PAIRCTL_PHASE_TIMEOUT_SECS".to_string(),
            message: "not a number".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PAIRCTL_PHASE_TIMEOUT_SECS"));
        assert!(msg.contains("not a number"));
    }

    // --- From conversions into top-level Error ---

    #[test]
    fn test_error_from_pairing_error() {
        let err = Error::from(PairingError::AlreadyPairing);
        assert!(err.to_string().contains("Pairing error"));
    }

    #[test]
    fn test_error_from_version_error() {
        let err = Error::from(VersionError::UnsupportedConnectionVersion(7));
        assert!(err.to_string().contains("Version error"));
    }

    #[test]
    fn test_error_from_config_error() {
        let err = Error::from(ConfigError::ParseError("bad".to_string()));
        assert!(err.to_string().contains("Configuration error"));
    }
}
