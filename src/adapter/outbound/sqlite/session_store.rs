//! SQLite session store implementation.
//!
//! Keyed records with an explicit expiry. `claim` is a single upsert that
//! only overwrites an expired record, so concurrent claimers cannot both win.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Text;

use super::database::connection::{encode_time, with_conn, DbPool};
use super::database::schema::sessions;
use crate::error::Result;
use crate::port::outbound::store::SessionStore;

const CLAIM_SQL: &str = "INSERT INTO sessions (key, value, expires_at) VALUES (?, ?, ?) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at \
     WHERE sessions.expires_at <= ?";

/// SQLite-backed session store.
#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: DbPool,
}

impl SqliteSessionStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn claim(
        &self,
        key: &str,
        value: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let key = key.to_string();
        let value = value.to_string();
        let expires_at = encode_time(expires_at);
        let now = encode_time(now);
        with_conn(&self.pool, move |conn| {
            let written = diesel::sql_query(CLAIM_SQL)
                .bind::<Text, _>(&key)
                .bind::<Text, _>(&value)
                .bind::<Text, _>(&expires_at)
                .bind::<Text, _>(&now)
                .execute(conn)?;
            Ok(written == 1)
        })
        .await
    }

    async fn put(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let row = (
            sessions::key.eq(key.to_string()),
            sessions::value.eq(value.to_string()),
            sessions::expires_at.eq(encode_time(expires_at)),
        );
        with_conn(&self.pool, move |conn| {
            diesel::replace_into(sessions::table)
                .values(row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let key = key.to_string();
        let now = encode_time(now);
        with_conn(&self.pool, move |conn| {
            Ok(sessions::table
                .find(&key)
                .filter(sessions::expires_at.gt(&now))
                .select(sessions::value)
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        with_conn(&self.pool, move |conn| {
            diesel::delete(sessions::table.find(&key)).execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let now = encode_time(now);
        with_conn(&self.pool, move |conn| {
            Ok(diesel::delete(sessions::table.filter(sessions::expires_at.le(&now)))
                .execute(conn)?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::testkit::app::memory_pool;

    #[tokio::test]
    async fn claim_only_succeeds_after_expiry() {
        let store = SqliteSessionStore::new(memory_pool().unwrap());
        let now = Utc::now();
        let until = now + Duration::seconds(5);

        assert!(store.claim("k", "a", until, now).await.unwrap());
        assert!(!store.claim("k", "b", until, now).await.unwrap());
        assert_eq!(store.get("k", now).await.unwrap().as_deref(), Some("a"));

        assert!(store
            .claim("k", "c", until + Duration::seconds(5), until)
            .await
            .unwrap());
        assert_eq!(store.get("k", until).await.unwrap().as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn expired_records_are_hidden_and_purged() {
        let store = SqliteSessionStore::new(memory_pool().unwrap());
        let now = Utc::now();
        store
            .put("draft:1", "room-1", now + Duration::minutes(10))
            .await
            .unwrap();
        store.put("old", "x", now - Duration::seconds(1)).await.unwrap();

        assert!(store.get("old", now).await.unwrap().is_none());
        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert_eq!(
            store.get("draft:1", now).await.unwrap().as_deref(),
            Some("room-1")
        );

        store.remove("draft:1").await.unwrap();
        assert!(store.get("draft:1", now).await.unwrap().is_none());
    }
}
