use thiserror::Error;
use vm_proto::CodecError;
use vm_store::StoreError;

/// Coarse error class a transport maps onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    InvalidArgument,
    PayloadTooLarge,
    NotFound,
    Conflict,
    InvalidPayloadType,
    Internal,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Payload too large: {size} bytes, max {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Item conflict: {0}")]
    Conflict(String),

    #[error("Invalid payload type: {0}")]
    InvalidPayloadType(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidPayloadType(_) => ErrorKind::InvalidPayloadType,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<CodecError> for ServiceError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidPayloadType(msg) => Self::InvalidPayloadType(msg),
            // A stored blob that does not decode as its own type, or a value
            // that will not encode, is an integrity fault, not a caller error.
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::TypeMismatch { .. } => Self::InvalidPayloadType(err.to_string()),
            StoreError::Codec(codec) => codec.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vm_proto::ItemType;

    #[test]
    fn store_errors_map_onto_the_taxonomy() {
        let cases = [
            (StoreError::NotFound("x".into()), ErrorKind::NotFound),
            (StoreError::Conflict("dup".into()), ErrorKind::Conflict),
            (
                StoreError::TypeMismatch { stored: ItemType::Text, given: ItemType::Card },
                ErrorKind::InvalidPayloadType,
            ),
            (StoreError::Integrity("no payload".into()), ErrorKind::Internal),
            (StoreError::Migration("boom".into()), ErrorKind::Internal),
        ];
        for (err, kind) in cases {
            assert_eq!(ServiceError::from(err).kind(), kind);
        }
    }

    #[test]
    fn malformed_blob_is_internal() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ServiceError::from(CodecError::Malformed { kind: ItemType::Card, source });
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn tag_mismatch_keeps_its_kind() {
        let err = ServiceError::from(CodecError::InvalidPayloadType("nope".into()));
        assert_eq!(err.kind(), ErrorKind::InvalidPayloadType);
    }
}
