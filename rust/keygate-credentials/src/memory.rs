//! A software key store holding P-256 keys in process memory.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use p256::ecdsa::{Signature, SigningKey, signature::Signer as _};
use rand::rngs::OsRng;
use tokio::sync::RwLock;

use crate::{
    AlwaysConfirm, KeyHandle, KeyStore, KeyStoreError, PresenceError, PresencePurpose,
    UserPresence,
};

/// A [`KeyStore`] backed by a [`HashMap`] of P-256 signing keys, gated by a
/// [`UserPresence`] implementation.
///
/// Public keys are exported as uncompressed SEC1 points (65 bytes) and
/// signatures as DER-encoded ECDSA P-256 / SHA-256, matching what a
/// platform secure element hands back. Nothing is persisted.
///
/// Clones share the same keys.
pub struct MemoryKeyStore<P = AlwaysConfirm> {
    keys: Arc<RwLock<HashMap<KeyHandle, SigningKey>>>,
    presence: Arc<P>,
}

impl<P> Clone for MemoryKeyStore<P> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            presence: self.presence.clone(),
        }
    }
}

impl<P> std::fmt::Debug for MemoryKeyStore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKeyStore").finish_non_exhaustive()
    }
}

impl Default for MemoryKeyStore<AlwaysConfirm> {
    fn default() -> Self {
        Self::new(AlwaysConfirm)
    }
}

impl<P> MemoryKeyStore<P>
where
    P: UserPresence,
{
    /// Create an empty store that consults `presence` before enrolling or
    /// signing.
    pub fn new(presence: P) -> Self {
        Self {
            keys: Arc::new(RwLock::new(HashMap::new())),
            presence: Arc::new(presence),
        }
    }

    /// Delete the key pair under `handle`, returning whether one existed.
    pub async fn remove(&self, handle: &KeyHandle) -> bool {
        self.keys.write().await.remove(handle).is_some()
    }

    /// Number of provisioned key pairs.
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    /// Whether no key pairs are provisioned.
    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }

    async fn key(&self, handle: &KeyHandle) -> Result<SigningKey, KeyStoreError> {
        self.keys
            .read()
            .await
            .get(handle)
            .cloned()
            .ok_or_else(|| KeyStoreError::NoSuchKey(handle.to_string()))
    }
}

#[async_trait]
impl<P> KeyStore for MemoryKeyStore<P>
where
    P: UserPresence,
{
    async fn exists(&self, handle: &KeyHandle) -> Result<bool, KeyStoreError> {
        Ok(self.keys.read().await.contains_key(handle))
    }

    async fn generate(&self, handle: &KeyHandle) -> Result<(), KeyStoreError> {
        self.presence
            .confirm(handle, PresencePurpose::Enroll)
            .await
            .map_err(|error| match error {
                PresenceError::Unavailable(reason) => KeyStoreError::Unavailable(reason),
                refused => KeyStoreError::Refused(refused.to_string()),
            })?;

        // Check and insert under one write lock so racing enrollments of a
        // handle settle on a single key pair.
        let mut keys = self.keys.write().await;
        if keys.contains_key(handle) {
            tracing::debug!(%handle, "key pair already present, keeping it");
        } else {
            keys.insert(handle.clone(), SigningKey::random(&mut OsRng));
            tracing::debug!(%handle, "generated key pair");
        }
        Ok(())
    }

    async fn public_key_bytes(&self, handle: &KeyHandle) -> Result<Vec<u8>, KeyStoreError> {
        let key = self.key(handle).await?;
        Ok(key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec())
    }

    async fn sign(&self, handle: &KeyHandle, data: &[u8]) -> Result<Vec<u8>, KeyStoreError> {
        let key = self.key(handle).await?;

        self.presence
            .confirm(handle, PresencePurpose::Sign)
            .await
            .map_err(|error| match error {
                PresenceError::Denied => KeyStoreError::UserDenied,
                PresenceError::TimedOut => KeyStoreError::TimedOut,
                PresenceError::Unavailable(reason) => KeyStoreError::Unavailable(reason),
            })?;

        let signature: Signature = key
            .try_sign(data)
            .map_err(|error| KeyStoreError::Backend(error.to_string()))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }
}
