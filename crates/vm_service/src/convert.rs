//! Conversions between wire items and store items.

use chrono::Utc;
use vm_proto::{Payload, WireDataType, WireItem, WireMeta};
use vm_store::{Item, ItemDto, Meta};

use crate::error::ServiceError;

pub fn meta_from_wire(meta: Vec<WireMeta>) -> Vec<Meta> {
    meta.into_iter()
        .map(|m| Meta { tag: m.tag, text: m.text })
        .collect()
}

pub fn meta_to_wire(meta: Vec<Meta>) -> Vec<WireMeta> {
    meta.into_iter()
        .map(|m| WireMeta { tag: m.tag, text: m.text })
        .collect()
}

/// Tag-directed decode of the wire union, then encode into the opaque form.
pub fn dto_from_wire(item: WireItem) -> Result<ItemDto, ServiceError> {
    let payload = Payload::from_wire(item.data_type, item.data)?;
    Ok(ItemDto::new(item.name, &payload, meta_from_wire(item.meta))?)
}

/// Wire item for an upsert. Timestamps the caller left unset are filled with
/// the current time; the store keeps its own `created_at` on conflict.
pub fn item_from_wire(user_id: &str, item: WireItem) -> Result<Item, ServiceError> {
    let payload = Payload::from_wire(item.data_type, item.data)?;
    let now = Utc::now();
    Ok(Item::new(
        item.id,
        user_id,
        item.name,
        item.version,
        item.created_at.unwrap_or(now),
        item.updated_at.unwrap_or(now),
        &payload,
        meta_from_wire(item.meta),
    )?)
}

/// Decode the stored blob against the stored tag. A blob that does not
/// decode is reported as `Internal`.
pub fn item_to_wire(item: Item) -> Result<WireItem, ServiceError> {
    let payload = item.payload()?;
    Ok(WireItem {
        id: item.id,
        user_id: item.user_id,
        name: item.name,
        data_type: WireDataType::from(item.item_type),
        version: item.version,
        created_at: Some(item.created_at),
        updated_at: Some(item.updated_at),
        data: Some(payload.into_wire()),
        meta: meta_to_wire(item.meta),
    })
}
