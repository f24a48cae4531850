//! vm_store — Transactional item storage for Vaultme
//!
//! # Layout
//! Three tables: `item` (one row per secret), `item_data` (its opaque
//! payload, one-to-one) and `meta` (tag/text annotations, one-to-many).
//! Payload and metadata rows are only ever written through the item
//! operations in `items`, inside the same transaction as the item row.
//!
//! # Migration
//! SQLx migrations in `migrations/` are embedded and run on open.

pub mod db;
pub mod error;
pub mod items;
pub mod migrations;
pub mod models;

pub use db::Store;
pub use error::StoreError;
pub use items::SqliteItemStore;
pub use models::{Item, ItemDto, ItemStorage, Meta};
