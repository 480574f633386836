use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use super::model::{LocalItem, SyncedList};
use super::now_ms;
use super::origin::RawItemAdded;

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("list not found: {0}")]
    ListNotFound(String),
    #[error("item {uid} not found in list {list_id}")]
    ItemNotFound { list_id: String, uid: String },
}

/// The host's list-entity platform.
///
/// Lists are addressed by the remote list id they mirror. Every item entering
/// a list raises one generic add notification, whoever created it.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Creates the list entity or renames it. Returns `true` when created.
    async fn ensure_list(&self, list: &SyncedList, name: &str) -> Result<bool, LocalStoreError>;
    async fn has_list(&self, list_id: &str) -> Result<bool, LocalStoreError>;
    async fn remove_list(&self, list_id: &str) -> Result<(), LocalStoreError>;
    async fn get_items(&self, list_id: &str) -> Result<Vec<LocalItem>, LocalStoreError>;
    /// Appends an item and returns its uid.
    async fn add_item(
        &self,
        list_id: &str,
        text: &str,
        completed: bool,
    ) -> Result<String, LocalStoreError>;
    async fn update_item(
        &self,
        list_id: &str,
        uid: &str,
        text: Option<&str>,
        completed: Option<bool>,
    ) -> Result<(), LocalStoreError>;
    async fn remove_item(&self, list_id: &str, uid: &str) -> Result<(), LocalStoreError>;
    /// Moves `uids` to the front in the given order; other items follow in
    /// their current order.
    async fn reorder_list(&self, list_id: &str, uids: &[String]) -> Result<(), LocalStoreError>;
}

/// SQLite-backed list entities sharing the daemon database.
pub struct SqliteListStore {
    pool: SqlitePool,
    added: mpsc::UnboundedSender<RawItemAdded>,
}

impl SqliteListStore {
    pub fn new(pool: SqlitePool, added: mpsc::UnboundedSender<RawItemAdded>) -> Self {
        Self { pool, added }
    }

    pub async fn list_name(&self, list_id: &str) -> Result<Option<String>, LocalStoreError> {
        let row = sqlx::query("SELECT name FROM local_lists WHERE id = ?1")
            .bind(list_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get("name")?),
            None => None,
        })
    }

    async fn require_list(&self, list_id: &str) -> Result<(), LocalStoreError> {
        if self.has_list(list_id).await? {
            Ok(())
        } else {
            Err(LocalStoreError::ListNotFound(list_id.to_string()))
        }
    }
}

fn new_uid() -> String {
    format!("{:016x}", rand::random::<u64>())
}

#[async_trait]
impl LocalStore for SqliteListStore {
    async fn ensure_list(&self, list: &SyncedList, name: &str) -> Result<bool, LocalStoreError> {
        let existing = self.list_name(&list.remote_list_id).await?;
        match existing {
            Some(current) if current == name => Ok(false),
            Some(_) => {
                debug!(list_id = %list.remote_list_id, name, "renaming local list");
                sqlx::query("UPDATE local_lists SET name = ?2 WHERE id = ?1")
                    .bind(&list.remote_list_id)
                    .bind(name)
                    .execute(&self.pool)
                    .await?;
                Ok(false)
            }
            None => {
                sqlx::query("INSERT INTO local_lists (id, entity_id, name) VALUES (?1, ?2, ?3)")
                    .bind(&list.remote_list_id)
                    .bind(&list.local_list_id)
                    .bind(name)
                    .execute(&self.pool)
                    .await?;
                Ok(true)
            }
        }
    }

    async fn has_list(&self, list_id: &str) -> Result<bool, LocalStoreError> {
        let row = sqlx::query("SELECT 1 FROM local_lists WHERE id = ?1")
            .bind(list_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn remove_list(&self, list_id: &str) -> Result<(), LocalStoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM local_items WHERE list_id = ?1")
            .bind(list_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM local_lists WHERE id = ?1")
            .bind(list_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_items(&self, list_id: &str) -> Result<Vec<LocalItem>, LocalStoreError> {
        let rows = sqlx::query(
            "SELECT uid, text, completed, updated_at FROM local_items WHERE list_id = ?1 ORDER BY position ASC",
        )
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let completed: i64 = row.try_get("completed")?;
            items.push(LocalItem {
                uid: row.try_get("uid")?,
                text: row.try_get("text")?,
                completed: completed != 0,
                updated_at: row.try_get("updated_at")?,
            });
        }
        Ok(items)
    }

    async fn add_item(
        &self,
        list_id: &str,
        text: &str,
        completed: bool,
    ) -> Result<String, LocalStoreError> {
        self.require_list(list_id).await?;
        let uid = new_uid();
        sqlx::query(
            "INSERT INTO local_items (uid, list_id, text, completed, position, updated_at)
             VALUES (?1, ?2, ?3, ?4,
                     (SELECT COALESCE(MAX(position), -1) + 1 FROM local_items WHERE list_id = ?2),
                     ?5)",
        )
        .bind(&uid)
        .bind(list_id)
        .bind(text)
        .bind(if completed { 1 } else { 0 })
        .bind(now_ms())
        .execute(&self.pool)
        .await?;

        // Nobody listening is fine; the item is stored either way.
        let _ = self.added.send(RawItemAdded {
            list_id: list_id.to_string(),
            uid: uid.clone(),
            text: text.to_string(),
            completed,
        });
        Ok(uid)
    }

    async fn update_item(
        &self,
        list_id: &str,
        uid: &str,
        text: Option<&str>,
        completed: Option<bool>,
    ) -> Result<(), LocalStoreError> {
        let result = sqlx::query(
            "UPDATE local_items
             SET text = COALESCE(?3, text),
                 completed = COALESCE(?4, completed),
                 updated_at = ?5
             WHERE list_id = ?1 AND uid = ?2",
        )
        .bind(list_id)
        .bind(uid)
        .bind(text)
        .bind(completed.map(i64::from))
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(LocalStoreError::ItemNotFound {
                list_id: list_id.to_string(),
                uid: uid.to_string(),
            });
        }
        Ok(())
    }

    async fn remove_item(&self, list_id: &str, uid: &str) -> Result<(), LocalStoreError> {
        let result = sqlx::query("DELETE FROM local_items WHERE list_id = ?1 AND uid = ?2")
            .bind(list_id)
            .bind(uid)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(LocalStoreError::ItemNotFound {
                list_id: list_id.to_string(),
                uid: uid.to_string(),
            });
        }
        Ok(())
    }

    async fn reorder_list(&self, list_id: &str, uids: &[String]) -> Result<(), LocalStoreError> {
        let current: Vec<String> = self
            .get_items(list_id)
            .await?
            .into_iter()
            .map(|item| item.uid)
            .collect();
        let mut order: Vec<&String> = uids.iter().filter(|uid| current.contains(*uid)).collect();
        order.extend(current.iter().filter(|uid| !uids.contains(*uid)));

        let mut tx = self.pool.begin().await?;
        for (position, uid) in order.into_iter().enumerate() {
            sqlx::query("UPDATE local_items SET position = ?3 WHERE list_id = ?1 AND uid = ?2")
                .bind(list_id)
                .bind(uid)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
