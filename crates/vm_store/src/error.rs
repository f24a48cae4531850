use thiserror::Error;
use vm_proto::{CodecError, ItemType};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Item already exists: {0}")]
    Conflict(String),

    #[error("Item type is immutable: stored {stored}, given {given}")]
    TypeMismatch { stored: ItemType, given: ItemType },

    #[error("Stored item is corrupt: {0}")]
    Integrity(String),

    #[error("Database error while {context}: {source}")]
    Database {
        context: &'static str,
        source: sqlx::Error,
    },

    #[error("Payload codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// Wrap a driver error with the step that produced it. Uniqueness
    /// violations become `Conflict`; everything else stays a storage fault.
    pub(crate) fn db(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| match &source {
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::Conflict(format!("{context}: {e}"))
            }
            _ => Self::Database { context, source },
        }
    }
}
