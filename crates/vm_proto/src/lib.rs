//! vm_proto — Payload variants, opaque encoding, and wire types for Vaultme
//!
//! Every stored item carries an opaque byte blob whose interpretation is
//! governed by its `ItemType` tag. This crate owns the closed set of payload
//! variants, their byte encoding, and the wire-level union the boundary
//! layer exchanges with clients.
//!
//! # Modules
//! - `payload` — `ItemType`, the four variants, and the `Payload` sum type
//! - `codec`   — byte encoding helpers and `CodecError`
//! - `api`     — wire union (`WireData`, `WireItem`) and tag-directed decode

pub mod api;
pub mod codec;
pub mod payload;

pub use api::{WireData, WireDataType, WireItem, WireMeta};
pub use codec::CodecError;
pub use payload::{Card, Credential, EncodePayload, File, ItemType, Payload, Text};
