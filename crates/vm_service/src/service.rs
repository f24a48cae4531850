use std::future::Future;
use std::time::Duration;

use vm_proto::WireItem;
use vm_store::{ItemStorage, StoreError};

use crate::config::ServiceConfig;
use crate::convert::{dto_from_wire, item_from_wire, item_to_wire};
use crate::error::ServiceError;

/// Policy limits applied at the boundary before anything reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_payload_size: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub op_timeout: Duration,
}

impl From<&ServiceConfig> for Limits {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            op_timeout: config.op_timeout(),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&ServiceConfig::default())
    }
}

/// Item operations for an already-authenticated caller.
pub struct ItemService<S> {
    store: S,
    limits: Limits,
}

impl<S: ItemStorage> ItemService<S> {
    pub fn new(store: S, limits: Limits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub async fn get_item(&self, user_id: &str, item_id: &str) -> Result<WireItem, ServiceError> {
        let user_id = caller(user_id)?;
        let item = self
            .bounded("get item", self.store.get_item(user_id, item_id))
            .await
            .inspect_err(|e| log_failure("get_item", user_id, e))?;
        tracing::debug!(method = "get_item", user_id, item_id, "item served");
        item_to_wire(item)
    }

    /// Store a new item and return its id.
    pub async fn create_item(&self, user_id: &str, item: WireItem) -> Result<String, ServiceError> {
        let user_id = caller(user_id)?;
        let dto = dto_from_wire(item)?;
        self.check_size(dto.data.len())?;

        let created = self
            .bounded("create item", self.store.create_item(user_id, &dto))
            .await
            .inspect_err(|e| log_failure("create_item", user_id, e))?;
        tracing::debug!(method = "create_item", user_id, item_id = %created.id, "item stored");
        Ok(created.id)
    }

    /// Upsert an item by id and return the id.
    pub async fn update_item(&self, user_id: &str, item: WireItem) -> Result<String, ServiceError> {
        let user_id = caller(user_id)?;
        if item.id.trim().is_empty() {
            return Err(ServiceError::InvalidArgument("item id is empty".into()));
        }
        let item = item_from_wire(user_id, item)?;
        self.check_size(item.data.len())?;

        let updated = self
            .bounded("update item", self.store.update_item(user_id, &item))
            .await
            .inspect_err(|e| log_failure("update_item", user_id, e))?;
        tracing::debug!(method = "update_item", user_id, item_id = %updated.id, "item stored");
        Ok(updated.id)
    }

    /// A page of the caller's items. `limit == 0` asks for the default page
    /// size; larger requests are clamped to the configured maximum.
    pub async fn list_items(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<WireItem>, ServiceError> {
        let user_id = caller(user_id)?;
        let limit = self.page_size(limit);

        let items = self
            .bounded("list items", self.store.list_items(user_id, limit, offset))
            .await
            .inspect_err(|e| log_failure("list_items", user_id, e))?;
        tracing::debug!(method = "list_items", user_id, count = items.len(), "items served");
        items.into_iter().map(item_to_wire).collect()
    }

    fn page_size(&self, requested: u32) -> u32 {
        match requested {
            0 => self.limits.default_page_size,
            n => n.min(self.limits.max_page_size),
        }
    }

    fn check_size(&self, size: usize) -> Result<(), ServiceError> {
        if size > self.limits.max_payload_size {
            return Err(ServiceError::PayloadTooLarge {
                size,
                limit: self.limits.max_payload_size,
            });
        }
        Ok(())
    }

    /// Run a store call under the operation deadline. On expiry the store
    /// future is dropped, which rolls back its transaction.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ServiceError> {
        match tokio::time::timeout(self.limits.op_timeout, call).await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(_) => Err(ServiceError::Internal(format!(
                "{operation} exceeded deadline of {:?}",
                self.limits.op_timeout
            ))),
        }
    }
}

/// The transport hands over whatever identity it extracted; a blank one
/// means the request was never bound to a user.
fn caller(user_id: &str) -> Result<&str, ServiceError> {
    if user_id.trim().is_empty() {
        return Err(ServiceError::Unauthenticated("user id is empty".into()));
    }
    Ok(user_id)
}

fn log_failure(method: &'static str, user_id: &str, err: &ServiceError) {
    match err {
        ServiceError::Internal(_) => tracing::error!(method, user_id, error = %err, "item request failed"),
        _ => tracing::warn!(method, user_id, error = %err, "item request rejected"),
    }
}
