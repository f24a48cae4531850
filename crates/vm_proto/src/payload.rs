//! Typed payload variants carried inside an item.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{self, CodecError};

/// Closed set of item type tags. The string forms are persisted in the
/// `item.type` column and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    /// Login + password.
    Credential,
    /// Free-form text.
    Text,
    /// Binary file contents.
    Raw,
    /// Bank card: number, owner, validity date.
    Card,
}

impl ItemType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credential => "CREDENTIAL",
            Self::Text => "TEXT",
            Self::Raw => "RAW",
            Self::Card => "CARD",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDENTIAL" => Ok(Self::Credential),
            "TEXT" => Ok(Self::Text),
            "RAW" => Ok(Self::Raw),
            "CARD" => Ok(Self::Card),
            other => Err(CodecError::InvalidPayloadType(format!(
                "unknown item type {other:?}"
            ))),
        }
    }
}

/// A payload variant that can serialise itself to the opaque item encoding.
pub trait EncodePayload {
    fn encode(&self) -> Result<Vec<u8>, CodecError>;
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub login: String,
    pub password: String,
}

/// Never prints the password.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub data: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub number: String,
    pub owner: String,
    pub validity_to: DateTime<Utc>,
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail: String = self
            .number
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        f.debug_struct("Card")
            .field("number", &format_args!("****{tail}"))
            .field("owner", &self.owner)
            .field("validity_to", &self.validity_to)
            .finish()
    }
}

/// File contents. The item name doubles as the display file name.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    #[serde(rename = "ext")]
    pub extension: String,
    #[serde(with = "codec::base64_bytes")]
    pub data: Vec<u8>,
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("name", &self.name)
            .field("extension", &self.extension)
            .field("size_bytes", &self.data.len())
            .finish()
    }
}

impl EncodePayload for Credential {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        codec::to_bytes(ItemType::Credential, self)
    }
}

impl EncodePayload for Text {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        codec::to_bytes(ItemType::Text, self)
    }
}

impl EncodePayload for Card {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        codec::to_bytes(ItemType::Card, self)
    }
}

impl EncodePayload for File {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        codec::to_bytes(ItemType::Raw, self)
    }
}

/// One of the four payload shapes an item can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Credential(Credential),
    Text(Text),
    Card(Card),
    File(File),
}

impl Payload {
    /// The tag under which this payload is stored.
    pub fn item_type(&self) -> ItemType {
        match self {
            Self::Credential(_) => ItemType::Credential,
            Self::Text(_) => ItemType::Text,
            Self::Card(_) => ItemType::Card,
            Self::File(_) => ItemType::Raw,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Credential(c) => c.encode(),
            Self::Text(t) => t.encode(),
            Self::Card(c) => c.encode(),
            Self::File(f) => f.encode(),
        }
    }

    /// Decode an opaque blob as the variant named by `item_type`.
    ///
    /// A blob that does not parse as the declared variant is a data
    /// integrity fault and yields `CodecError::Malformed`.
    pub fn decode(item_type: ItemType, bytes: &[u8]) -> Result<Self, CodecError> {
        match item_type {
            ItemType::Credential => codec::from_bytes(item_type, bytes).map(Self::Credential),
            ItemType::Text => codec::from_bytes(item_type, bytes).map(Self::Text),
            ItemType::Card => codec::from_bytes(item_type, bytes).map(Self::Card),
            ItemType::Raw => codec::from_bytes(item_type, bytes).map(Self::File),
        }
    }
}

impl From<Credential> for Payload {
    fn from(value: Credential) -> Self {
        Self::Credential(value)
    }
}

impl From<Text> for Payload {
    fn from(value: Text) -> Self {
        Self::Text(value)
    }
}

impl From<Card> for Payload {
    fn from(value: Card) -> Self {
        Self::Card(value)
    }
}

impl From<File> for Payload {
    fn from(value: File) -> Self {
        Self::File(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn samples() -> Vec<Payload> {
        vec![
            Credential { login: "x".into(), password: "y".into() }.into(),
            Text { data: "remember the milk".into() }.into(),
            Card {
                number: "4111111111111111".into(),
                owner: "JANE DOE".into(),
                validity_to: Utc.with_ymd_and_hms(2029, 8, 31, 0, 0, 0).unwrap(),
            }
            .into(),
            File {
                name: "id_rsa".into(),
                extension: "pem".into(),
                data: (0u8..=255).collect(),
            }
            .into(),
        ]
    }

    #[test]
    fn every_variant_roundtrips_through_its_tag() {
        for payload in samples() {
            let bytes = payload.encode().unwrap();
            let decoded = Payload::decode(payload.item_type(), &bytes).unwrap();
            assert_eq!(decoded, payload);
        }
    }

    #[test]
    fn decoding_under_the_wrong_tag_fails() {
        let bytes = Payload::from(Text { data: "hi".into() }).encode().unwrap();
        let err = Payload::decode(ItemType::Card, &bytes).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { kind: ItemType::Card, .. }));
    }

    #[test]
    fn tags_parse_and_print_symmetrically() {
        for t in [ItemType::Credential, ItemType::Text, ItemType::Raw, ItemType::Card] {
            assert_eq!(t.as_str().parse::<ItemType>().unwrap(), t);
        }
        assert!(matches!(
            "BLOB".parse::<ItemType>(),
            Err(CodecError::InvalidPayloadType(_))
        ));
    }

    #[test]
    fn file_payload_is_stored_under_raw() {
        let f = File { name: "a".into(), extension: "b".into(), data: vec![] };
        assert_eq!(Payload::from(f).item_type(), ItemType::Raw);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cred = Credential { login: "me".into(), password: "hunter2".into() };
        assert!(!format!("{cred:?}").contains("hunter2"));

        let card = Card {
            number: "4111111111111234".into(),
            owner: "ME".into(),
            validity_to: Utc::now(),
        };
        let out = format!("{card:?}");
        assert!(out.contains("****1234"));
        assert!(!out.contains("4111111111111234"));
    }
}
