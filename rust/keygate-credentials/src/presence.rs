use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::KeyHandle;

/// Why a key store is asking the holder to confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresencePurpose {
    /// A new key pair is about to be created.
    Enroll,
    /// An existing key is about to sign.
    Sign,
}

/// Outcomes of a confirmation prompt other than approval.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenceError {
    /// The holder declined.
    #[error("confirmation declined")]
    Denied,

    /// Nobody answered in time.
    #[error("confirmation timed out")]
    TimedOut,

    /// Confirmation is not possible on this device.
    #[error("confirmation unavailable: {0}")]
    Unavailable(String),
}

/// A biometric (or equivalent) user confirmation gate.
///
/// Confirmation may take arbitrarily long; implementations decide whether to
/// time out.
#[async_trait]
pub trait UserPresence: Send + Sync {
    /// Ask the holder to approve `purpose` for `handle`.
    async fn confirm(&self, handle: &KeyHandle, purpose: PresencePurpose)
    -> Result<(), PresenceError>;
}

#[async_trait]
impl<P> UserPresence for Arc<P>
where
    P: UserPresence + ?Sized,
{
    async fn confirm(
        &self,
        handle: &KeyHandle,
        purpose: PresencePurpose,
    ) -> Result<(), PresenceError> {
        (**self).confirm(handle, purpose).await
    }
}

/// Approves every prompt immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

#[async_trait]
impl UserPresence for AlwaysConfirm {
    async fn confirm(&self, _: &KeyHandle, _: PresencePurpose) -> Result<(), PresenceError> {
        Ok(())
    }
}

/// Declines every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDeny;

#[async_trait]
impl UserPresence for AlwaysDeny {
    async fn confirm(&self, _: &KeyHandle, _: PresencePurpose) -> Result<(), PresenceError> {
        Err(PresenceError::Denied)
    }
}
