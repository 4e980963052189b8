use serde::{Deserialize, Deserializer, Serialize};

use crate::KeyHandleError;

/// An opaque, caller-chosen name for a logical key slot.
///
/// A handle maps to at most one key pair in a [`KeyStore`](crate::KeyStore)
/// at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct KeyHandle(String);

impl KeyHandle {
    /// Create a handle from a non-empty name.
    ///
    /// # Errors
    ///
    /// Returns [`KeyHandleError::Empty`] for an empty name.
    pub fn new(name: impl Into<String>) -> Result<Self, KeyHandleError> {
        let name = name.into();
        if name.is_empty() {
            return Err(KeyHandleError::Empty);
        }
        Ok(Self(name))
    }

    /// The handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for KeyHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for KeyHandle {
    type Error = KeyHandleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for KeyHandle {
    type Error = KeyHandleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for KeyHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Self::new(name).map_err(serde::de::Error::custom)
    }
}
