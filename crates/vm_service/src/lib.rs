//! vm_service — Item service boundary for Vaultme
//!
//! Sits between a transport (gRPC, HTTP, CLI) and the item store. It checks
//! the caller identity and payload limits, converts between the wire union
//! and the store's opaque payload bytes, bounds every store call with a
//! deadline, and maps failures onto a small error taxonomy.

pub mod config;
pub mod convert;
pub mod error;
pub mod service;

pub use config::{ConfigError, ServiceConfig};
pub use error::{ErrorKind, ServiceError};
pub use service::{ItemService, Limits};
