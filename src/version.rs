//! Version tags for connection tokens and pairing wire behavior.
//!
//! The two axes evolve independently. New tokens are minted at `LATEST` on
//! both axes, and a receiver refuses any tag it does not recognize. Pulling
//! the tag out of a token is the token parser's job, not ours.

use serde::{Deserialize, Serialize};

use crate::error::VersionError;

/// Format revision of a connection token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ConnectionTokenVersion {
    V1 = 1,
}

impl ConnectionTokenVersion {
    pub const LATEST: Self = Self::V1;

    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ConnectionTokenVersion {
    type Error = VersionError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Self::V1),
            other => Err(VersionError::UnsupportedConnectionVersion(other)),
        }
    }
}

impl From<ConnectionTokenVersion> for u8 {
    fn from(version: ConnectionTokenVersion) -> Self {
        version.tag()
    }
}

/// Revision of the pairing exchange itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum PairingVersion {
    V1 = 1,
    /// Installation is confirmed back to the sender before success.
    V2 = 2,
}

impl PairingVersion {
    pub const LATEST: Self = Self::V2;

    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PairingVersion {
    type Error = VersionError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(VersionError::UnsupportedPairingVersion(other)),
        }
    }
}

impl From<PairingVersion> for u8 {
    fn from(version: PairingVersion) -> Self {
        version.tag()
    }
}

/// Both version tags declared for one attempt, already validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiatedVersions {
    /// Connection token format.
    pub connection: ConnectionTokenVersion,
    /// Pairing protocol.
    pub pairing: PairingVersion,
}

impl NegotiatedVersions {
    /// The versions a freshly minted token declares.
    pub const fn latest() -> Self {
        Self {
            connection: ConnectionTokenVersion::LATEST,
            pairing: PairingVersion::LATEST,
        }
    }

    /// Validate raw tags from an external token parser.
    pub fn from_tags(connection: u8, pairing: u8) -> Result<Self, VersionError> {
        Ok(Self {
            connection: ConnectionTokenVersion::try_from(connection)?,
            pairing: PairingVersion::try_from(pairing)?,
        })
    }
}

impl Default for NegotiatedVersions {
    fn default() -> Self {
        Self::latest()
    }
}
