//! Wire-level item shapes exchanged with the transport layer.
//!
//! `WireData` is a generic union: exactly one arm is active, and it must
//! agree with the item's `WireDataType` tag. `Payload::from_wire` is the only
//! place where the tag selects which variant to accept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::CodecError;
use crate::payload::{Card, Credential, File, ItemType, Payload, Text};

/// Transport tag. `Unknown` is what an unset enum field decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WireDataType {
    #[default]
    Unknown,
    Credential,
    Text,
    Raw,
    Card,
}

impl From<ItemType> for WireDataType {
    fn from(value: ItemType) -> Self {
        match value {
            ItemType::Credential => Self::Credential,
            ItemType::Text => Self::Text,
            ItemType::Raw => Self::Raw,
            ItemType::Card => Self::Card,
        }
    }
}

impl TryFrom<WireDataType> for ItemType {
    type Error = CodecError;

    fn try_from(value: WireDataType) -> Result<Self, Self::Error> {
        match value {
            WireDataType::Credential => Ok(Self::Credential),
            WireDataType::Text => Ok(Self::Text),
            WireDataType::Raw => Ok(Self::Raw),
            WireDataType::Card => Ok(Self::Card),
            WireDataType::Unknown => Err(CodecError::InvalidPayloadType(
                "item type is not set".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireData {
    Credential(Credential),
    Text(Text),
    Card(Card),
    Raw(File),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMeta {
    pub tag: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: WireDataType,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Option<WireData>,
    #[serde(default)]
    pub meta: Vec<WireMeta>,
}

impl WireItem {
    /// A client-side draft for a new item: no id, timestamps or version.
    pub fn draft(name: impl Into<String>, payload: Payload, meta: Vec<WireMeta>) -> Self {
        Self {
            name: name.into(),
            data_type: payload.item_type().into(),
            data: Some(payload.into_wire()),
            meta,
            ..Self::default()
        }
    }
}

impl Payload {
    /// Accept a wire union under the given tag.
    ///
    /// Fails with `InvalidPayloadType` when the tag is not one of the four
    /// known values, the union is empty, or its active arm disagrees with
    /// the tag.
    pub fn from_wire(tag: WireDataType, data: Option<WireData>) -> Result<Self, CodecError> {
        let expected = ItemType::try_from(tag)?;
        let data = data.ok_or_else(|| {
            CodecError::InvalidPayloadType(format!("{expected} item carries no payload"))
        })?;

        let payload = match data {
            WireData::Credential(c) => Self::Credential(c),
            WireData::Text(t) => Self::Text(t),
            WireData::Card(c) => Self::Card(c),
            WireData::Raw(f) => Self::File(f),
        };

        if payload.item_type() != expected {
            return Err(CodecError::InvalidPayloadType(format!(
                "payload is {} but item is tagged {expected}",
                payload.item_type()
            )));
        }
        Ok(payload)
    }

    pub fn into_wire(self) -> WireData {
        match self {
            Self::Credential(c) => WireData::Credential(c),
            Self::Text(t) => WireData::Text(t),
            Self::Card(c) => WireData::Card(c),
            Self::File(f) => WireData::Raw(f),
        }
    }
}
