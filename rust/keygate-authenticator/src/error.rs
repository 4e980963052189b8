use keygate_credentials::AttestationError;
use thiserror::Error;

use crate::{ProvisioningError, SignerError, bytes::DecodeError};

/// Every way a request can fail.
///
/// Each variant terminates the request; its `Display` string is the
/// `reason` delivered to the caller in `{error: reason}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticatorError {
    /// No input item carried a property-list attachment.
    #[error("failed to find message")]
    NoMessageFound,

    /// The message is missing a field, has a field of the wrong type, or
    /// names an unknown request type.
    #[error("invalid request: {0}")]
    Validation(String),

    /// `toSign` is not a valid byte-array string.
    #[error("invalid toSign: {0}")]
    Decode(#[from] DecodeError),

    /// The key pair for the handle could not be found or created.
    #[error("error generating or finding key: {0}")]
    Provisioning(String),

    /// The attestation certificate could not be generated.
    #[error("error generating certificate: {0}")]
    Attestation(String),

    /// A signing primitive or the key store failed while signing.
    #[error("failed to sign message: {0}")]
    Signing(String),

    /// Signing was requested for a handle with no provisioned key.
    #[error("no key provisioned for handle '{0}'")]
    NoSuchKey(String),

    /// The holder declined biometric confirmation.
    #[error("user declined to sign")]
    UserDenied,
}

impl AuthenticatorError {
    /// Whether this error is about the shape of the request rather than a
    /// failure of one of the components serving it.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Decode(_))
    }
}

impl From<ProvisioningError> for AuthenticatorError {
    fn from(error: ProvisioningError) -> Self {
        Self::Provisioning(error.to_string())
    }
}

impl From<AttestationError> for AuthenticatorError {
    fn from(error: AttestationError) -> Self {
        match error {
            AttestationError::Generation(reason) => Self::Attestation(reason),
            AttestationError::Signing(reason) => Self::Signing(reason),
        }
    }
}

impl From<SignerError> for AuthenticatorError {
    fn from(error: SignerError) -> Self {
        match error {
            SignerError::NoSuchKey(handle) => Self::NoSuchKey(handle),
            SignerError::UserDenied => Self::UserDenied,
            SignerError::Signing(source) => Self::Signing(source.to_string()),
        }
    }
}
