use thiserror::Error;

/// Errors reported by a [`KeyStore`](crate::KeyStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyStoreError {
    /// No key pair is provisioned under the requested handle.
    #[error("no key provisioned for handle '{0}'")]
    NoSuchKey(String),

    /// The holder declined the biometric confirmation.
    #[error("user declined confirmation")]
    UserDenied,

    /// The store gave up waiting for confirmation.
    #[error("confirmation timed out")]
    TimedOut,

    /// The store refused to create a key (e.g. enrollment was declined).
    #[error("key generation refused: {0}")]
    Refused(String),

    /// The store cannot be reached.
    #[error("key store unavailable: {0}")]
    Unavailable(String),

    /// Any other failure inside the store.
    #[error("key store failure: {0}")]
    Backend(String),
}

/// Errors when constructing a [`KeyHandle`](crate::KeyHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyHandleError {
    /// Key handles must name something.
    #[error("key handle is empty")]
    Empty,
}
