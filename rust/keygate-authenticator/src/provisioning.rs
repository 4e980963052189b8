use keygate_credentials::{KeyHandle, KeyStore, KeyStoreError};
use thiserror::Error;

/// Errors from [`KeyProvisioning::ensure_key`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
    /// The existence check failed.
    #[error("key lookup failed: {0}")]
    Lookup(KeyStoreError),

    /// The store refused or failed to create the key pair.
    #[error("error generating key pair: {0}")]
    Generation(KeyStoreError),

    /// The public key could not be read back.
    #[error("public key export failed: {0}")]
    Export(KeyStoreError),

    /// The store handed back no public key bytes.
    #[error("key store returned an empty public key")]
    EmptyPublicKey,
}

/// Ensures a key pair exists for a handle and hands back its public key.
#[derive(Debug, Clone)]
pub struct KeyProvisioning<S> {
    store: S,
}

impl<S> KeyProvisioning<S>
where
    S: KeyStore,
{
    /// Provision keys in `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Return the public key bytes for `handle`, generating a key pair first
    /// if none exists.
    ///
    /// Idempotent: repeated calls for a handle return the same bytes, and
    /// the already-exists path performs nothing beyond the existence check.
    ///
    /// # Errors
    ///
    /// Returns a [`ProvisioningError`] if the store cannot be queried,
    /// refuses to generate, or cannot export the public key.
    pub async fn ensure_key(&self, handle: &KeyHandle) -> Result<Vec<u8>, ProvisioningError> {
        if self
            .store
            .exists(handle)
            .await
            .map_err(ProvisioningError::Lookup)?
        {
            tracing::debug!(%handle, "key pair exists");
        } else {
            self.store
                .generate(handle)
                .await
                .map_err(ProvisioningError::Generation)?;
            tracing::info!(%handle, "generated key pair");
        }

        let public_key = self
            .store
            .public_key_bytes(handle)
            .await
            .map_err(ProvisioningError::Export)?;

        if public_key.is_empty() {
            return Err(ProvisioningError::EmptyPublicKey);
        }
        Ok(public_key)
    }
}
