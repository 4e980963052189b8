use keygate_credentials::{KeyHandle, KeyStore, KeyStoreError};
use thiserror::Error;

/// Errors from [`SignerDispatch::sign`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// The handle has no provisioned key.
    #[error("no key provisioned for handle '{0}'")]
    NoSuchKey(String),

    /// The holder declined confirmation.
    #[error("user declined to sign")]
    UserDenied,

    /// Any other store failure, including a store-reported timeout.
    #[error("signing failed: {0}")]
    Signing(KeyStoreError),
}

impl From<KeyStoreError> for SignerError {
    fn from(error: KeyStoreError) -> Self {
        match error {
            KeyStoreError::NoSuchKey(handle) => Self::NoSuchKey(handle),
            KeyStoreError::UserDenied => Self::UserDenied,
            other => Self::Signing(other),
        }
    }
}

/// Signs with already-provisioned hardware keys. Never creates keys.
#[derive(Debug, Clone)]
pub struct SignerDispatch<S> {
    store: S,
}

impl<S> SignerDispatch<S>
where
    S: KeyStore,
{
    /// Sign with keys held in `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Sign `data` with the key for `handle`.
    ///
    /// Suspends for as long as the key store waits on the holder's
    /// confirmation; no timeout is imposed here.
    ///
    /// # Errors
    ///
    /// See [`SignerError`].
    pub async fn sign(&self, handle: &KeyHandle, data: &[u8]) -> Result<Vec<u8>, SignerError> {
        Ok(self.store.sign(handle, data).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keygate_credentials::MemoryKeyStore;

    #[tokio::test]
    async fn never_creates_keys() {
        let store = MemoryKeyStore::default();
        let dispatch = SignerDispatch::new(store.clone());
        let handle = KeyHandle::new("abc").unwrap();

        let result = dispatch.sign(&handle, b"data").await;

        assert_eq!(result, Err(SignerError::NoSuchKey("abc".into())));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn signs_with_provisioned_keys() {
        let store = MemoryKeyStore::default();
        let handle = KeyHandle::new("abc").unwrap();
        store.generate(&handle).await.unwrap();

        let signature = SignerDispatch::new(store).sign(&handle, b"data").await;

        assert!(signature.is_ok_and(|signature| !signature.is_empty()));
    }

    #[test]
    fn store_errors_map_onto_signer_errors() {
        assert_eq!(
            SignerError::from(KeyStoreError::UserDenied),
            SignerError::UserDenied
        );
        assert_eq!(
            SignerError::from(KeyStoreError::TimedOut),
            SignerError::Signing(KeyStoreError::TimedOut)
        );
        assert_eq!(
            SignerError::from(KeyStoreError::Unavailable("locked".into())),
            SignerError::Signing(KeyStoreError::Unavailable("locked".into()))
        );
    }
}
