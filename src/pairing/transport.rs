//! The seam to whatever actually moves bytes between devices.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PhaseError, VersionError};
use crate::pairing::token::ConnectionToken;
use crate::version::{ConnectionTokenVersion, NegotiatedVersions, PairingVersion};

/// The three steps of a pairing attempt, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Connect,
    Transfer,
    Install,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Self::Connect, Self::Transfer, Self::Install];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Transfer => "transfer",
            Self::Install => "install",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to one pairing attempt.
///
/// The version tags come from whoever parsed the token; they are checked
/// against the known versions before the attempt is admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingRequest {
    /// Token scanned or pasted by the user.
    pub token: ConnectionToken,
    /// Declared connection token format tag.
    pub connection_version: u8,
    /// Declared pairing protocol tag.
    pub pairing_version: u8,
}

impl PairingRequest {
    /// A request declaring the latest versions, as a newly minted token does.
    pub fn new(token: impl Into<ConnectionToken>) -> Self {
        Self {
            token: token.into(),
            connection_version: ConnectionTokenVersion::LATEST.tag(),
            pairing_version: PairingVersion::LATEST.tag(),
        }
    }

    pub fn with_versions(
        token: impl Into<ConnectionToken>,
        connection_version: u8,
        pairing_version: u8,
    ) -> Self {
        Self {
            token: token.into(),
            connection_version,
            pairing_version,
        }
    }

    pub fn versions(&self) -> Result<NegotiatedVersions, VersionError> {
        NegotiatedVersions::from_tags(self.connection_version, self.pairing_version)
    }
}

/// Performs the three pairing phases.
///
/// `transfer` reports undecryptable payloads as [`PhaseError::Decryption`];
/// every other failure uses the variant for its phase.
#[async_trait]
pub trait PairingTransport: Send + Sync + 'static {
    async fn connect(&self, request: &PairingRequest) -> Result<(), PhaseError>;

    /// Receive and decrypt the pairing payload.
    async fn transfer(&self, request: &PairingRequest) -> Result<Vec<u8>, PhaseError>;

    async fn install(&self, request: &PairingRequest, payload: Vec<u8>)
    -> Result<(), PhaseError>;
}
