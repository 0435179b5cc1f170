//! The base64 codec.
//!
//! Uses the standard alphabet (`A-Za-z0-9+/`) with `=` padding.
//! Encoded input must be padded to a multiple of four characters.

use ::base64::{engine::general_purpose::STANDARD, DecodeError, Engine};
use thiserror::Error;

/// A base64 decode error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Base64DecodeError {
    /// The encoded length is not a multiple of four.
    #[error("Non-Valid base64: length {0} is not a multiple of 4")]
    InvalidLength(usize),
    /// An invalid character.
    #[error("Non-Valid base64: invalid character {character:?} at offset {offset}")]
    InvalidCharacter {
        /// The character.
        character: char,
        /// The offset of the character in the encoded input.
        offset: usize,
    },
    /// Padding in an invalid position or of an invalid length.
    #[error("Non-Valid base64: malformed padding")]
    InvalidPadding,
}

impl From<DecodeError> for Base64DecodeError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::InvalidByte(_, b'=')
            | DecodeError::InvalidLastSymbol(_, _)
            | DecodeError::InvalidPadding => Self::InvalidPadding,
            DecodeError::InvalidByte(offset, byte) => Self::InvalidCharacter {
                character: char::from(byte),
                offset,
            },
            DecodeError::InvalidLength(length) => Self::InvalidLength(length),
        }
    }
}

/// Encode `bytes` as base64.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 `encoded` text.
///
/// # Errors
/// Returns a [`Base64DecodeError`] if the length of `encoded` is not a multiple of four, it contains a character outside the alphabet, or its padding is malformed.
pub fn decode(encoded: &str) -> Result<Vec<u8>, Base64DecodeError> {
    if encoded.len() % 4 != 0 {
        return Err(Base64DecodeError::InvalidLength(encoded.len()));
    }
    Ok(STANDARD.decode(encoded)?)
}
