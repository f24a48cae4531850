//! Item CRUD over SQLite.
//!
//! Every public operation runs in exactly one transaction and leaves it
//! through `finish`, which commits on success and rolls back on error. If the
//! operation's future is dropped before that point (caller cancelled, deadline
//! hit), the open `sqlx::Transaction` is dropped with it and rolls back, so a
//! partial item, payload or metadata write is never committed.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Item, ItemDto, ItemRow, ItemStorage, ItemWithDataRow, Meta, MetaRow};

const INITIAL_VERSION: i64 = 1;

const ITEM_COLUMNS: &str = "id, user_id, name, type, version, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteItemStore {
    pool: SqlitePool,
}

impl SqliteItemStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(StoreError::db("starting transaction"))
    }
}

/// Commit on `Ok`, roll back on `Err`. A failed rollback is logged and
/// never replaces the error that caused it.
async fn finish<T>(
    tx: Transaction<'static, Sqlite>,
    result: Result<T, StoreError>,
    operation: &'static str,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(StoreError::db("committing transaction"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::error!(operation, error = %rollback, "rolling back transaction failed");
            }
            Err(err)
        }
    }
}

#[async_trait]
impl ItemStorage for SqliteItemStore {
    async fn get_item(&self, user_id: &str, item_id: &str) -> Result<Item, StoreError> {
        let mut tx = self.begin().await?;
        let result = fetch_item(&mut tx, user_id, item_id).await;
        finish(tx, result, "get item").await
    }

    async fn create_item(&self, user_id: &str, dto: &ItemDto) -> Result<Item, StoreError> {
        let mut tx = self.begin().await?;
        let result = insert_item(&mut tx, user_id, dto).await;
        let item = finish(tx, result, "create item").await?;

        tracing::info!(
            item_id = %item.id,
            user_id,
            item_type = %item.item_type,
            meta = item.meta.len(),
            "item created"
        );
        Ok(item)
    }

    async fn update_item(&self, user_id: &str, item: &Item) -> Result<Item, StoreError> {
        let mut tx = self.begin().await?;
        let result = upsert_item(&mut tx, user_id, item).await;
        let stored = finish(tx, result, "update item").await?;

        tracing::info!(
            item_id = %stored.id,
            user_id,
            version = stored.version,
            meta = stored.meta.len(),
            "item updated"
        );
        Ok(stored)
    }

    async fn list_items(&self, user_id: &str, limit: u32, offset: u32) -> Result<Vec<Item>, StoreError> {
        let mut tx = self.begin().await?;
        let result = fetch_page(&mut tx, user_id, limit, offset).await;
        let items = finish(tx, result, "list items").await?;

        tracing::debug!(user_id, limit, offset, count = items.len(), "listed items");
        Ok(items)
    }
}

// ── Transaction bodies ───────────────────────────────────────────────────────

async fn fetch_item(
    conn: &mut SqliteConnection,
    user_id: &str,
    item_id: &str,
) -> Result<Item, StoreError> {
    let row: Option<ItemWithDataRow> = sqlx::query_as(
        "SELECT i.id, i.user_id, i.name, i.type, i.version, i.created_at, i.updated_at, d.data
         FROM item AS i
         LEFT JOIN item_data AS d ON d.item_id = i.id
         WHERE i.user_id = ? AND i.id = ?",
    )
    .bind(user_id)
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(StoreError::db("fetching item"))?;

    let row = row.ok_or_else(|| StoreError::NotFound(item_id.to_string()))?;
    let mut meta = fetch_meta(conn, &[row.item.id.as_str()]).await?;
    let item_meta = meta.remove(&row.item.id).unwrap_or_default();
    row.into_item(item_meta)
}

async fn insert_item(
    conn: &mut SqliteConnection,
    user_id: &str,
    dto: &ItemDto,
) -> Result<Item, StoreError> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let row: ItemRow = sqlx::query_as(&format!(
        "INSERT INTO item (id, user_id, name, type, version, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(&id)
    .bind(user_id)
    .bind(&dto.name)
    .bind(dto.item_type.as_str())
    .bind(INITIAL_VERSION)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(StoreError::db("inserting item"))?;

    upsert_data(conn, &row.id, &dto.data).await?;
    replace_meta(conn, &row.id, &dto.meta).await?;

    row.into_item(dto.data.clone(), dto.meta.clone())
}

async fn upsert_item(
    conn: &mut SqliteConnection,
    user_id: &str,
    item: &Item,
) -> Result<Item, StoreError> {
    let now = Utc::now();

    // The WHERE clause keeps another user's row untouched; in that case no
    // row comes back and the caller sees NotFound.
    let row: Option<ItemRow> = sqlx::query_as(&format!(
        "INSERT INTO item (id, user_id, name, type, version, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             version = excluded.version,
             updated_at = excluded.updated_at
         WHERE item.user_id = excluded.user_id
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(&item.id)
    .bind(user_id)
    .bind(&item.name)
    .bind(item.item_type.as_str())
    .bind(item.version)
    .bind(now)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await
    .map_err(StoreError::db("upserting item"))?;

    let row = row.ok_or_else(|| StoreError::NotFound(item.id.clone()))?;

    let stored = row.stored_type()?;
    if stored != item.item_type {
        return Err(StoreError::TypeMismatch {
            stored,
            given: item.item_type,
        });
    }

    upsert_data(conn, &row.id, &item.data).await?;
    replace_meta(conn, &row.id, &item.meta).await?;

    row.into_item(item.data.clone(), item.meta.clone())
}

async fn fetch_page(
    conn: &mut SqliteConnection,
    user_id: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<Item>, StoreError> {
    let rows: Vec<ItemWithDataRow> = sqlx::query_as(
        "SELECT i.id, i.user_id, i.name, i.type, i.version, i.created_at, i.updated_at, d.data
         FROM item AS i
         LEFT JOIN item_data AS d ON d.item_id = i.id
         WHERE i.user_id = ?
         ORDER BY i.rowid
         LIMIT ? OFFSET ?",
    )
    .bind(user_id)
    .bind(i64::from(limit))
    .bind(i64::from(offset))
    .fetch_all(&mut *conn)
    .await
    .map_err(StoreError::db("fetching item page"))?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<&str> = rows.iter().map(|r| r.item.id.as_str()).collect();
    let mut meta = fetch_meta(conn, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let item_meta = meta.remove(&row.item.id).unwrap_or_default();
            row.into_item(item_meta)
        })
        .collect()
}

// ── Payload and metadata helpers ─────────────────────────────────────────────

async fn upsert_data(conn: &mut SqliteConnection, item_id: &str, data: &[u8]) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO item_data (item_id, data) VALUES (?, ?)
         ON CONFLICT(item_id) DO UPDATE SET data = excluded.data",
    )
    .bind(item_id)
    .bind(data)
    .execute(&mut *conn)
    .await
    .map_err(StoreError::db("writing item payload"))?;
    Ok(())
}

/// Delete-then-reinsert: tags absent from `meta` are gone afterwards.
async fn replace_meta(conn: &mut SqliteConnection, item_id: &str, meta: &[Meta]) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM meta WHERE item_id = ?")
        .bind(item_id)
        .execute(&mut *conn)
        .await
        .map_err(StoreError::db("clearing item metadata"))?;

    for m in meta {
        sqlx::query("INSERT INTO meta (item_id, tag, text) VALUES (?, ?, ?)")
            .bind(item_id)
            .bind(&m.tag)
            .bind(&m.text)
            .execute(&mut *conn)
            .await
            .map_err(StoreError::db("inserting item metadata"))?;
    }
    Ok(())
}

/// Metadata for a set of items in one query, grouped by item id and kept in
/// insertion order.
async fn fetch_meta(
    conn: &mut SqliteConnection,
    item_ids: &[&str],
) -> Result<HashMap<String, Vec<Meta>>, StoreError> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT item_id, tag, text FROM meta WHERE item_id IN (");
    let mut ids = qb.separated(", ");
    for id in item_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY rowid");

    let rows: Vec<MetaRow> = qb
        .build_query_as()
        .fetch_all(&mut *conn)
        .await
        .map_err(StoreError::db("fetching item metadata"))?;

    let mut grouped: HashMap<String, Vec<Meta>> = HashMap::new();
    for row in rows {
        grouped.entry(row.item_id).or_default().push(Meta {
            tag: row.tag,
            text: row.text,
        });
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use vm_proto::{ItemType, Payload, Text};

    async fn store() -> (tempfile::TempDir, SqliteItemStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("vault.db"), 4).await.unwrap();
        (dir, store.items())
    }

    fn text_dto(name: &str, meta: Vec<Meta>) -> ItemDto {
        ItemDto::new(name, &Payload::from(Text { data: name.into() }), meta).unwrap()
    }

    #[tokio::test]
    async fn create_assigns_id_version_and_timestamps() {
        let (_dir, items) = store().await;
        let item = items.create_item("u1", &text_dto("a", vec![])).await.unwrap();

        assert!(!item.id.is_empty());
        assert_eq!(item.user_id, "u1");
        assert_eq!(item.version, INITIAL_VERSION);
        assert_eq!(item.created_at, item.updated_at);
        assert_eq!(item.item_type, ItemType::Text);
    }

    #[tokio::test]
    async fn meta_keeps_insertion_order() {
        let (_dir, items) = store().await;
        let meta = vec![
            Meta::new("z", "1"),
            Meta::new("a", "2"),
            Meta::new("m", "3"),
        ];
        let created = items.create_item("u1", &text_dto("a", meta.clone())).await.unwrap();
        let fetched = items.get_item("u1", &created.id).await.unwrap();
        assert_eq!(fetched.meta, meta);
    }

    #[tokio::test]
    async fn item_is_invisible_to_other_users() {
        let (_dir, items) = store().await;
        let created = items.create_item("u1", &text_dto("a", vec![])).await.unwrap();

        let err = items.get_item("u2", &created.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(items.list_items("u2", 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_page_returns_no_items() {
        let (_dir, items) = store().await;
        items.create_item("u1", &text_dto("a", vec![])).await.unwrap();
        assert!(items.list_items("u1", 10, 5).await.unwrap().is_empty());
        assert!(items.list_items("u1", 0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unique_violation_surfaces_as_conflict() {
        let (_dir, items) = store().await;
        let created = items.create_item("u1", &text_dto("a", vec![])).await.unwrap();

        let mut tx = items.begin().await.unwrap();
        let err = sqlx::query(
            "INSERT INTO item (id, user_id, name, type, version, created_at, updated_at)
             VALUES (?, 'u1', 'dup', 'TEXT', 1, ?, ?)",
        )
        .bind(&created.id)
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(StoreError::db("inserting item"))
        .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        let _ = finish::<()>(tx, Err(err), "test").await;
    }
}
