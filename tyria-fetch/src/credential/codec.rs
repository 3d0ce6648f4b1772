//! Reversible encodings for the persisted credential.
//!
//! These are obfuscation, not protection. A backend that needs real secrecy
//! (the system keychain) provides it itself; the codec only decides what the
//! stored bytes look like.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

/// Encodes a credential before it is persisted and decodes it on restore.
pub trait CredentialCodec: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Encodes a normalized credential.
    fn encode(&self, value: &str) -> String;

    /// Decodes a persisted value.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Decode`] if `encoded` was not produced by
    /// this codec.
    fn decode(&self, encoded: &str) -> Result<String, CredentialError>;
}

/// Standard-alphabet base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Codec;

impl CredentialCodec for Base64Codec {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn encode(&self, value: &str) -> String {
        STANDARD.encode(value.as_bytes())
    }

    fn decode(&self, encoded: &str) -> Result<String, CredentialError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CredentialError::Decode(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CredentialError::Decode(e.to_string()))
    }
}

/// Stores the credential as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl CredentialCodec for PlainCodec {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn encode(&self, value: &str) -> String {
        value.to_string()
    }

    fn decode(&self, encoded: &str) -> Result<String, CredentialError> {
        Ok(encoded.to_string())
    }
}

/// Configurable choice of codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialEncoding {
    /// [`Base64Codec`].
    #[default]
    Base64,
    /// [`PlainCodec`].
    Plain,
}

impl CredentialEncoding {
    /// Builds the codec for this encoding.
    pub fn codec(self) -> Arc<dyn CredentialCodec> {
        match self {
            CredentialEncoding::Base64 => Arc::new(Base64Codec),
            CredentialEncoding::Plain => Arc::new(PlainCodec),
        }
    }
}

impl fmt::Display for CredentialEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialEncoding::Base64 => write!(f, "base64"),
            CredentialEncoding::Plain => write!(f, "plain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_roundtrip() {
        let codec = Base64Codec;
        let encoded = codec.encode("abc123");
        assert_eq!(encoded, "YWJjMTIz");
        assert_eq!(codec.decode(&encoded).unwrap(), "abc123");
    }

    #[test]
    fn test_base64_rejects_garbage() {
        let codec = Base64Codec;
        assert!(matches!(
            codec.decode("%%%not base64%%%"),
            Err(CredentialError::Decode(_))
        ));
        // Valid base64, invalid UTF-8.
        assert!(matches!(codec.decode("/w=="), Err(CredentialError::Decode(_))));
    }

    #[test]
    fn test_plain_is_identity() {
        let codec = PlainCodec;
        assert_eq!(codec.encode("abc123"), "abc123");
        assert_eq!(codec.decode("abc123").unwrap(), "abc123");
    }

    #[test]
    fn test_encoding_selects_codec() {
        assert_eq!(CredentialEncoding::Base64.codec().name(), "base64");
        assert_eq!(CredentialEncoding::Plain.codec().name(), "plain");
    }
}
