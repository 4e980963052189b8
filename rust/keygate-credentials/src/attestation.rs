//! Registration attestation.
//!
//! An attestation is a short-lived self-signed certificate together with the
//! ephemeral private key whose public half the certificate carries. It is
//! issued once per registration, signs exactly the registration payload, and
//! is dropped afterwards. Nothing here is persisted.

mod config;
mod error;
mod self_signed;

pub use config::AttestationConfig;
pub use error::AttestationError;
pub use self_signed::{SelfSignedAttestation, SelfSignedIssuer};

use async_trait::async_trait;

/// A certificate plus the private key it certifies.
///
/// [`Attestation::sign`] must use the key whose public half is embedded in
/// [`Attestation::to_der`], so that the pair returned to a relying party is
/// cryptographically linked.
pub trait Attestation: Send + Sync {
    /// The DER encoding of the certificate.
    fn to_der(&self) -> &[u8];

    /// Sign `data` with the attestation's private key.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError::Signing`] if the primitive fails.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, AttestationError>;
}

/// Produces fresh [`Attestation`]s.
#[async_trait]
pub trait AttestationIssuer: Send + Sync {
    /// The attestation type this issuer hands out.
    type Attestation: Attestation;

    /// Generate a new certificate and its ephemeral key.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError::Generation`] if the certificate cannot be
    /// produced. Callers treat this as fatal for the current registration.
    async fn issue(&self) -> Result<Self::Attestation, AttestationError>;
}
