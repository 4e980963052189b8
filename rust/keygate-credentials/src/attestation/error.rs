use thiserror::Error;

/// Errors from attestation issuance and signing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttestationError {
    /// The certificate or its key could not be generated.
    #[error("certificate generation failed: {0}")]
    Generation(String),

    /// The attestation key failed to sign.
    #[error("attestation signing failed: {0}")]
    Signing(String),
}
