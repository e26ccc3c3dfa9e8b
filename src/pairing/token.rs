//! Opaque connection tokens.
//!
//! A token identifies one pairing negotiation. Nothing here looks inside it;
//! the only operations are equality, hashing and display.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for one pairing negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionToken(String);

impl ConnectionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Mint a fresh, random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ConnectionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ConnectionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for ConnectionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
