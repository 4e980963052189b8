use keygate_credentials::KeyHandle;
use serde_json::{Map, Value};

use crate::{AuthenticatorError, bytes::decode_byte_array};

/// Field naming the request kind.
pub const TYPE_FIELD: &str = "type";
/// Field naming the key slot.
pub const KEY_HANDLE_FIELD: &str = "keyHandle";
/// Field carrying the bytes to sign, as byte-array text.
pub const TO_SIGN_FIELD: &str = "toSign";

/// The two request kinds a page may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `"register"`
    Register,
    /// `"sign"`
    Sign,
}

impl RequestKind {
    /// The wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Sign => "sign",
        }
    }
}

impl std::str::FromStr for RequestKind {
    type Err = AuthenticatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register" => Ok(Self::Register),
            "sign" => Ok(Self::Sign),
            other => Err(AuthenticatorError::Validation(format!(
                "unknown request type '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated incoming request.
///
/// Everything downstream of [`Request::parse`] works with this closed type,
/// never with the raw mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Provision (or locate) a key and attest to it.
    Register {
        /// The key slot to provision.
        key_handle: KeyHandle,
        /// Caller bytes to prefix the public key with before signing.
        to_sign: Vec<u8>,
    },
    /// Sign with an existing key.
    Sign {
        /// The key slot to sign with.
        key_handle: KeyHandle,
        /// Bytes to sign.
        to_sign: Vec<u8>,
    },
}

impl Request {
    /// Validate a pre-processed message mapping.
    ///
    /// `type` is checked first, then `keyHandle` (a non-empty string), then
    /// `toSign` (a string holding a byte array).
    ///
    /// # Errors
    ///
    /// [`AuthenticatorError::Validation`] for a missing or mistyped field or
    /// an unknown type, [`AuthenticatorError::Decode`] for an undecodable
    /// `toSign`.
    pub fn parse(message: &Value) -> Result<Self, AuthenticatorError> {
        let fields = message
            .as_object()
            .ok_or_else(|| AuthenticatorError::Validation("request is not a mapping".into()))?;

        let kind: RequestKind = string_field(fields, TYPE_FIELD)?.parse()?;

        let key_handle = KeyHandle::new(string_field(fields, KEY_HANDLE_FIELD)?).map_err(|error| {
            AuthenticatorError::Validation(format!("field '{KEY_HANDLE_FIELD}': {error}"))
        })?;

        let to_sign = decode_byte_array(string_field(fields, TO_SIGN_FIELD)?)?;

        Ok(match kind {
            RequestKind::Register => Self::Register {
                key_handle,
                to_sign,
            },
            RequestKind::Sign => Self::Sign {
                key_handle,
                to_sign,
            },
        })
    }

    /// Which kind of request this is.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Register { .. } => RequestKind::Register,
            Self::Sign { .. } => RequestKind::Sign,
        }
    }

    /// The key slot the request addresses.
    pub fn key_handle(&self) -> &KeyHandle {
        match self {
            Self::Register { key_handle, .. } | Self::Sign { key_handle, .. } => key_handle,
        }
    }
}

fn string_field<'a>(
    fields: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a str, AuthenticatorError> {
    match fields.get(name) {
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(AuthenticatorError::Validation(format!(
            "field '{name}' is not a string"
        ))),
        None => Err(AuthenticatorError::Validation(format!(
            "missing field '{name}'"
        ))),
    }
}
