use serde_json::{Value, json};

use crate::{AuthenticatorError, bytes::encode_byte_array};

/// The single result delivered for a request.
///
/// In property-list form, binary fields are arrays of byte values and the
/// fields a page reads as text (`publicKey`, and the sign `signature`) are
/// byte-array strings, the same encoding requests use for `toSign`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Registration succeeded.
    Registered {
        /// Attestation signature over `toSign ‖ publicKey`.
        signature: Vec<u8>,
        /// The hardware public key for the handle.
        public_key: Vec<u8>,
        /// DER of the attestation certificate.
        certificate: Vec<u8>,
    },
    /// Signing succeeded.
    Signed {
        /// Hardware signature over `toSign`.
        signature: Vec<u8>,
    },
    /// The request failed.
    Failed {
        /// Human-readable reason.
        error: String,
    },
}

impl Envelope {
    /// Whether this envelope reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// The mapping handed to the calling page.
    pub fn to_property_list(&self) -> Value {
        match self {
            Self::Registered {
                signature,
                public_key,
                certificate,
            } => json!({
                "signature": signature,
                "publicKey": encode_byte_array(public_key),
                "certificate": certificate,
            }),
            Self::Signed { signature } => json!({
                "signature": encode_byte_array(signature),
            }),
            Self::Failed { error } => json!({ "error": error }),
        }
    }
}

impl From<&AuthenticatorError> for Envelope {
    fn from(error: &AuthenticatorError) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }
}
