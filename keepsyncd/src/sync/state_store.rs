use std::collections::BTreeMap;
use std::{fs, path::PathBuf};

use sqlx::{Row, SqlitePool, migrate::Migrator, sqlite::SqliteConnectOptions};
use thiserror::Error;

use super::model::{
    AgreedItem, AgreedList, AgreedSnapshot, IdentityEntry, IdentityMap, IdentityUpdate,
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XDG data directory is unavailable")]
    MissingDataDir,
    #[error("pass counter out of range: {0}")]
    InvalidPass(i64),
}

/// Persistence for identity links, agreed snapshots and pass counters.
#[derive(Clone)]
pub struct StateStore {
    pool: SqlitePool,
}

impl StateStore {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(database_url).await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    pub async fn open(db_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    pub async fn new_default() -> Result<Self, StoreError> {
        Self::open(default_db_path()?).await
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn load_identity(&self, account: &str) -> Result<IdentityMap, StoreError> {
        let rows = sqlx::query(
            "SELECT list_id, remote_id, local_uid, linked_at FROM identity WHERE account = ?1",
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(IdentityEntry {
                list_id: row.try_get("list_id")?,
                remote_id: row.try_get("remote_id")?,
                local_uid: row.try_get("local_uid")?,
                linked_at: row.try_get("linked_at")?,
            });
        }
        Ok(IdentityMap::from_entries(entries))
    }

    /// Records that an item exists on both sides. Any link that claimed
    /// either id in the same list is replaced.
    pub async fn link(&self, account: &str, entry: &IdentityEntry) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM identity WHERE account = ?1 AND list_id = ?2 AND (remote_id = ?3 OR local_uid = ?4)",
        )
        .bind(account)
        .bind(&entry.list_id)
        .bind(&entry.remote_id)
        .bind(&entry.local_uid)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO identity (account, list_id, remote_id, local_uid, linked_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(account)
        .bind(&entry.list_id)
        .bind(&entry.remote_id)
        .bind(&entry.local_uid)
        .bind(entry.linked_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn load_agreed(&self, account: &str) -> Result<AgreedSnapshot, StoreError> {
        let pass = self.pass_counter(account).await?;
        let list_rows = sqlx::query(
            "SELECT list_id, title, fetched_at FROM agreed_lists WHERE account = ?1",
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        let mut lists = BTreeMap::new();
        for row in list_rows {
            let list_id: String = row.try_get("list_id")?;
            lists.insert(
                list_id,
                AgreedList {
                    title: row.try_get("title")?,
                    fetched_at: row.try_get("fetched_at")?,
                    items: Vec::new(),
                },
            );
        }

        let item_rows = sqlx::query(
            "SELECT list_id, remote_id, local_uid, text, completed
             FROM agreed_items
             WHERE account = ?1
             ORDER BY list_id ASC, position ASC",
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        for row in item_rows {
            let list_id: String = row.try_get("list_id")?;
            let completed: i64 = row.try_get("completed")?;
            if let Some(list) = lists.get_mut(&list_id) {
                list.items.push(AgreedItem {
                    remote_id: row.try_get("remote_id")?,
                    local_uid: row.try_get("local_uid")?,
                    text: row.try_get("text")?,
                    completed: completed != 0,
                });
            }
        }

        Ok(AgreedSnapshot { pass, lists })
    }

    pub async fn pass_counter(&self, account: &str) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT pass FROM sync_accounts WHERE account = ?1")
            .bind(account)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(0);
        };
        let pass: i64 = row.try_get("pass")?;
        u64::try_from(pass).map_err(|_| StoreError::InvalidPass(pass))
    }

    /// Replaces the agreed snapshot, applies identity removals and advances
    /// the pass counter in one transaction.
    pub async fn commit_pass(
        &self,
        account: &str,
        agreed: &AgreedSnapshot,
        identity_updates: &[IdentityUpdate],
    ) -> Result<(), StoreError> {
        let pass = i64::try_from(agreed.pass).map_err(|_| StoreError::InvalidPass(i64::MAX))?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM agreed_items WHERE account = ?1")
            .bind(account)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM agreed_lists WHERE account = ?1")
            .bind(account)
            .execute(&mut *tx)
            .await?;

        for (list_id, list) in &agreed.lists {
            sqlx::query(
                "INSERT INTO agreed_lists (account, list_id, title, fetched_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(account)
            .bind(list_id)
            .bind(&list.title)
            .bind(list.fetched_at)
            .execute(&mut *tx)
            .await?;
            for (position, item) in list.items.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO agreed_items (account, list_id, position, remote_id, local_uid, text, completed)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .bind(account)
                .bind(list_id)
                .bind(position as i64)
                .bind(&item.remote_id)
                .bind(&item.local_uid)
                .bind(&item.text)
                .bind(if item.completed { 1 } else { 0 })
                .execute(&mut *tx)
                .await?;
            }
        }

        for update in identity_updates {
            match update {
                IdentityUpdate::Unlink { list_id, remote_id } => {
                    sqlx::query(
                        "DELETE FROM identity WHERE account = ?1 AND list_id = ?2 AND remote_id = ?3",
                    )
                    .bind(account)
                    .bind(list_id)
                    .bind(remote_id)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        sqlx::query(
            "INSERT INTO sync_accounts (account, pass) VALUES (?1, ?2)
             ON CONFLICT(account) DO UPDATE SET pass = excluded.pass",
        )
        .bind(account)
        .bind(pass)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Forgets everything known about a list that is no longer synced.
    pub async fn purge_list(&self, account: &str, list_id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for table in ["identity", "agreed_items", "agreed_lists"] {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE account = ?1 AND list_id = ?2"
            ))
            .bind(account)
            .bind(list_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

pub fn default_db_path() -> Result<PathBuf, StoreError> {
    let base = dirs::data_dir().ok_or(StoreError::MissingDataDir)?;
    Ok(base.join("keepsync").join("state.db"))
}

#[cfg(test)]
#[path = "state_store_tests.rs"]
mod tests;
