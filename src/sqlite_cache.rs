//! SQLite-backed [`FastCache`].
//!
//! Lives in the same database file as the store, so every process that opens
//! the file (a running server, one-off CLI commands) sees the same entries.
//! Invalidating from the CLI therefore also clears what the server would
//! serve next.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;

use hackscope_core::store::FastCache;

pub struct SqliteCache {
    pool: SqlitePool,
    ttl: Option<Duration>,
}

impl SqliteCache {
    /// `ttl = None` keeps entries until they are deleted.
    pub fn new(pool: SqlitePool, ttl: Option<Duration>) -> Self {
        Self { pool, ttl }
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn sweep(&self) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(now_millis())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl FastCache for SqliteCache {
    async fn get_hash(&self, key: &str) -> Result<Option<Value>> {
        let now = now_millis();
        let row: Option<(String, Option<i64>)> =
            sqlx::query_as("SELECT value_json, expires_at FROM cache_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            None => Ok(None),
            Some((json, expires_at)) if expires_at.map_or(true, |t| t > now) => {
                Ok(Some(serde_json::from_str(&json)?))
            }
            Some(_) => {
                // conditional, so a concurrent fresh write survives
                sqlx::query("DELETE FROM cache_entries WHERE key = ? AND expires_at <= ?")
                    .bind(key)
                    .bind(now)
                    .execute(&self.pool)
                    .await?;
                Ok(None)
            }
        }
    }

    async fn set_hash(&self, key: &str, value: &Value) -> Result<bool> {
        let now = now_millis();
        let expires_at = self.ttl.map(|ttl| now + ttl.as_millis() as i64);
        if self.ttl.is_some() {
            self.sweep().await?;
        }
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value_json, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value_json = excluded.value_json,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(serde_json::to_string(value)?)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, migrate};
    use serde_json::json;
    use tempfile::TempDir;

    async fn pool(tmp: &TempDir) -> SqlitePool {
        let pool = db::connect_path(&tmp.path().join("cache.sqlite"))
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn set_get_delete() {
        let tmp = TempDir::new().unwrap();
        let cache = SqliteCache::new(pool(&tmp).await, Some(Duration::from_secs(60)));

        assert!(cache.get_hash("k").await.unwrap().is_none());
        assert!(cache.set_hash("k", &json!({ "a": 1 })).await.unwrap());
        assert!(cache.set_hash("k", &json!({ "a": 2 })).await.unwrap());
        assert_eq!(cache.get_hash("k").await.unwrap(), Some(json!({ "a": 2 })));
        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn expired_entries_are_not_served_and_get_swept() {
        let tmp = TempDir::new().unwrap();
        let cache = SqliteCache::new(pool(&tmp).await, Some(Duration::ZERO));

        cache.set_hash("a", &json!(1)).await.unwrap();
        assert!(cache.get_hash("a").await.unwrap().is_none());

        cache.set_hash("b", &json!(2)).await.unwrap();
        cache.set_hash("c", &json!(3)).await.unwrap();
        // "b" went on the last write; "c" is expired already
        assert_eq!(cache.sweep().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn entries_are_shared_between_pools() {
        let tmp = TempDir::new().unwrap();
        let first = SqliteCache::new(pool(&tmp).await, None);
        let second = SqliteCache::new(pool(&tmp).await, None);

        first.set_hash("repo-analysis:o:r", &json!("v")).await.unwrap();
        assert_eq!(
            second.get_hash("repo-analysis:o:r").await.unwrap(),
            Some(json!("v"))
        );
        assert!(second.delete("repo-analysis:o:r").await.unwrap());
        assert!(first.get_hash("repo-analysis:o:r").await.unwrap().is_none());
    }
}
