use std::sync::Arc;

use async_trait::async_trait;

use crate::{KeyHandle, KeyStoreError};

/// A hardware-backed asymmetric key store.
///
/// Implementations own every private key exclusively; callers only ask for
/// operations by [`KeyHandle`]. Public key bytes are the only key material
/// that crosses this boundary.
///
/// The store is the sole arbiter of concurrent access to a handle. Callers
/// may rely on single-handle atomicity of [`KeyStore::generate`] and nothing
/// more.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Whether a key pair is provisioned under `handle`.
    async fn exists(&self, handle: &KeyHandle) -> Result<bool, KeyStoreError>;

    /// Create a key pair under `handle`.
    ///
    /// May suspend for biometric enrollment. Generating over an existing
    /// handle must leave the existing key pair intact.
    async fn generate(&self, handle: &KeyHandle) -> Result<(), KeyStoreError>;

    /// The raw public key bytes for `handle`.
    async fn public_key_bytes(&self, handle: &KeyHandle) -> Result<Vec<u8>, KeyStoreError>;

    /// Sign `data` with the private key for `handle`.
    ///
    /// May suspend indefinitely while the holder confirms; the store, not the
    /// caller, decides whether that wait ever times out.
    async fn sign(&self, handle: &KeyHandle, data: &[u8]) -> Result<Vec<u8>, KeyStoreError>;
}

#[async_trait]
impl<S> KeyStore for Arc<S>
where
    S: KeyStore + ?Sized,
{
    async fn exists(&self, handle: &KeyHandle) -> Result<bool, KeyStoreError> {
        (**self).exists(handle).await
    }

    async fn generate(&self, handle: &KeyHandle) -> Result<(), KeyStoreError> {
        (**self).generate(handle).await
    }

    async fn public_key_bytes(&self, handle: &KeyHandle) -> Result<Vec<u8>, KeyStoreError> {
        (**self).public_key_bytes(handle).await
    }

    async fn sign(&self, handle: &KeyHandle, data: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
        (**self).sign(handle, data).await
    }
}
