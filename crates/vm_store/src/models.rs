//! Item data model and the storage capability contract.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vm_proto::{CodecError, ItemType, Payload};

use crate::error::StoreError;

/// Tag/text annotation attached to exactly one item, e.g. `site = gmail.com`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub tag: String,
    pub text: String,
}

impl Meta {
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
        }
    }
}

/// Creation-time input. Id, timestamps and version are assigned by the store.
#[derive(Clone, PartialEq, Eq)]
pub struct ItemDto {
    /// User-given label; the file name for `RAW` items.
    pub name: String,
    pub item_type: ItemType,
    /// Opaque payload encoding, interpreted according to `item_type`.
    pub data: Vec<u8>,
    pub meta: Vec<Meta>,
}

impl ItemDto {
    /// Build a DTO from a typed payload. The tag is taken from the payload,
    /// so the two can never disagree.
    pub fn new(name: impl Into<String>, payload: &Payload, meta: Vec<Meta>) -> Result<Self, CodecError> {
        Ok(Self {
            name: name.into(),
            item_type: payload.item_type(),
            data: payload.encode()?,
            meta,
        })
    }
}

/// A stored secret record.
#[derive(Clone, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub item_type: ItemType,
    /// Caller-managed counter, persisted verbatim.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data: Vec<u8>,
    pub meta: Vec<Meta>,
}

impl Item {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        payload: &Payload,
        meta: Vec<Meta>,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            id: id.into(),
            user_id: user_id.into(),
            name: name.into(),
            item_type: payload.item_type(),
            version,
            created_at,
            updated_at,
            data: payload.encode()?,
            meta,
        })
    }

    /// Decode `data` as the variant named by `item_type`.
    pub fn payload(&self) -> Result<Payload, CodecError> {
        Payload::decode(self.item_type, &self.data)
    }
}

/// Payload bytes are never printed.
impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("name", &self.name)
            .field("item_type", &self.item_type)
            .field("version", &self.version)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("data", &format_args!("[{} bytes]", self.data.len()))
            .field("meta", &self.meta)
            .finish()
    }
}

impl fmt::Debug for ItemDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemDto")
            .field("name", &self.name)
            .field("item_type", &self.item_type)
            .field("data", &format_args!("[{} bytes]", self.data.len()))
            .field("meta", &self.meta)
            .finish()
    }
}

/// Storage operations on items, all scoped by the owning user.
#[async_trait]
pub trait ItemStorage: Send + Sync {
    /// Fetch one item with its payload and metadata.
    async fn get_item(&self, user_id: &str, item_id: &str) -> Result<Item, StoreError>;

    /// Insert a new item, its payload and metadata as one unit.
    async fn create_item(&self, user_id: &str, dto: &ItemDto) -> Result<Item, StoreError>;

    /// Upsert an item by id, overwriting name, version, payload and metadata.
    async fn update_item(&self, user_id: &str, item: &Item) -> Result<Item, StoreError>;

    /// One page of the user's items, each with its metadata.
    async fn list_items(&self, user_id: &str, limit: u32, offset: u32) -> Result<Vec<Item>, StoreError>;
}

// ── Row types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ItemRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[sqlx(rename = "type")]
    pub item_type: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItemRow {
    pub fn stored_type(&self) -> Result<ItemType, StoreError> {
        self.item_type.parse().map_err(|_| {
            StoreError::Integrity(format!(
                "item {} has unknown type {:?}",
                self.id, self.item_type
            ))
        })
    }

    pub fn into_item(self, data: Vec<u8>, meta: Vec<Meta>) -> Result<Item, StoreError> {
        let item_type = self.stored_type()?;
        Ok(Item {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            item_type,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            data,
            meta,
        })
    }
}

/// Item row joined with its (possibly missing) payload row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ItemWithDataRow {
    #[sqlx(flatten)]
    pub item: ItemRow,
    pub data: Option<Vec<u8>>,
}

impl ItemWithDataRow {
    pub fn into_item(self, meta: Vec<Meta>) -> Result<Item, StoreError> {
        let data = self.data.ok_or_else(|| {
            StoreError::Integrity(format!("item {} has no payload row", self.item.id))
        })?;
        self.item.into_item(data, meta)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct MetaRow {
    pub item_id: String,
    pub tag: String,
    pub text: String,
}
