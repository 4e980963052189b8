//! Byte buffers crossing the text boundary.
//!
//! The calling page cannot hand binary data over intact, so byte buffers
//! travel as the text of a JSON array of integers, e.g. `"[1,2,3]"`. This
//! module is the only place that representation is reconciled with native
//! buffers.

use serde_json::Value;
use thiserror::Error;

/// Errors decoding a byte-array string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The text is not valid JSON.
    #[error("malformed byte array text: {0}")]
    Malformed(String),

    /// The JSON value is not an array.
    #[error("byte array text is not an array")]
    NotAnArray,

    /// An element is not an integer in `0..=255`.
    #[error("element {index} of byte array is not a byte")]
    InvalidElement {
        /// Position of the offending element.
        index: usize,
    },
}

/// Decode `"[1,2,3]"`-style text into bytes.
///
/// All or nothing: any bad element fails the whole buffer.
///
/// # Errors
///
/// See [`DecodeError`].
pub fn decode_byte_array(text: &str) -> Result<Vec<u8>, DecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|error| DecodeError::Malformed(error.to_string()))?;

    let Value::Array(elements) = value else {
        return Err(DecodeError::NotAnArray);
    };

    elements
        .iter()
        .enumerate()
        .map(|(index, element)| {
            element
                .as_u64()
                .and_then(|number| u8::try_from(number).ok())
                .ok_or(DecodeError::InvalidElement { index })
        })
        .collect()
}

/// Encode bytes as `"[1,2,3]"`-style text, the inverse of
/// [`decode_byte_array`].
pub fn encode_byte_array(bytes: &[u8]) -> String {
    Value::from(bytes).to_string()
}
