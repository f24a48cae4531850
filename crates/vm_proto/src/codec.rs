//! Opaque payload encoding.
//!
//! Payloads are encoded as compact JSON objects. The same bytes are used for
//! the `item_data.data` storage column and for transport, so the encoding is
//! storage- and wire-agnostic. Binary file contents are carried as standard
//! base64 inside the JSON document.

use serde::{de::DeserializeOwned, Serialize};

use crate::payload::ItemType;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid payload type: {0}")]
    InvalidPayloadType(String),

    #[error("Malformed {kind} payload: {source}")]
    Malformed {
        kind: ItemType,
        source: serde_json::Error,
    },

    #[error("Encoding {kind} payload failed: {source}")]
    Encode {
        kind: ItemType,
        source: serde_json::Error,
    },
}

pub(crate) fn to_bytes<T: Serialize>(kind: ItemType, value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|source| CodecError::Encode { kind, source })
}

pub(crate) fn from_bytes<T: DeserializeOwned>(kind: ItemType, bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|source| CodecError::Malformed { kind, source })
}

/// Serde adapter carrying `Vec<u8>` as a standard base64 string.
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
