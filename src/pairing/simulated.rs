//! In-process transport that fakes the three phases.
//!
//! Used by the CLI and by tests. Each phase sleeps for a fixed delay and can
//! be made to fail.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PhaseError;
use crate::pairing::transport::{PairingRequest, PairingTransport};

/// Where a simulated attempt should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePoint {
    Connect,
    Transfer,
    Decrypt,
    Install,
}

impl std::fmt::Display for FailurePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Transfer => write!(f, "transfer"),
            Self::Decrypt => write!(f, "decrypt"),
            Self::Install => write!(f, "install"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    phase_delay: Duration,
    fail_at: Option<FailurePoint>,
}

impl SimulatedTransport {
    pub fn with_phase_delay(phase_delay: Duration) -> Self {
        Self {
            phase_delay,
            fail_at: None,
        }
    }

    /// No delay between phases.
    pub fn instant() -> Self {
        Self::with_phase_delay(Duration::ZERO)
    }

    pub fn failing_at(mut self, point: FailurePoint) -> Self {
        self.fail_at = Some(point);
        self
    }

    async fn pause(&self) {
        if !self.phase_delay.is_zero() {
            tokio::time::sleep(self.phase_delay).await;
        }
    }

    fn fails_at(&self, point: FailurePoint) -> bool {
        self.fail_at == Some(point)
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::with_phase_delay(Duration::from_millis(500))
    }
}

#[async_trait]
impl PairingTransport for SimulatedTransport {
    async fn connect(&self, request: &PairingRequest) -> Result<(), PhaseError> {
        self.pause().await;
        if self.fails_at(FailurePoint::Connect) {
            return Err(PhaseError::Connection(format!(
                "peer for {} unreachable",
                request.token
            )));
        }
        Ok(())
    }

    async fn transfer(&self, request: &PairingRequest) -> Result<Vec<u8>, PhaseError> {
        self.pause().await;
        if self.fails_at(FailurePoint::Transfer) {
            return Err(PhaseError::Transfer("stream closed mid-payload".to_string()));
        }
        if self.fails_at(FailurePoint::Decrypt) {
            return Err(PhaseError::Decryption("payload key mismatch".to_string()));
        }
        Ok(format!("payload:{}", request.token).into_bytes())
    }

    async fn install(
        &self,
        _request: &PairingRequest,
        payload: Vec<u8>,
    ) -> Result<(), PhaseError> {
        self.pause().await;
        if self.fails_at(FailurePoint::Install) {
            return Err(PhaseError::Installation("account already installed".to_string()));
        }
        if payload.is_empty() {
            return Err(PhaseError::Installation("empty payload".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_instant_transport_succeeds() {
        let transport = SimulatedTransport::instant();
        let request = PairingRequest::new("tok");

        transport.connect(&request).await.unwrap();
        let payload = transport.transfer(&request).await.unwrap();
        assert_eq!(payload, b"payload:tok".to_vec());
        transport.install(&request, payload).await.unwrap();
    }

    #[tokio::test]
    async fn test_decrypt_failure_surfaces_from_transfer() {
        let transport = SimulatedTransport::instant().failing_at(FailurePoint::Decrypt);
        let err = transport
            .transfer(&PairingRequest::new("tok"))
            .await
            .unwrap_err();
        assert!(matches!(err, PhaseError::Decryption(_)));
    }

    #[tokio::test]
    async fn test_install_rejects_empty_payload() {
        let transport = SimulatedTransport::instant();
        let err = transport
            .install(&PairingRequest::new("tok"), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PhaseError::Installation(_)));
    }
}
