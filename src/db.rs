//! Credential store backed by SQLite

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::models::User;

/// Connections kept by a file backed store
const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Opens the database at `url`, creating it if needed, and applies migrations
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(opts)
            .await?;

        Self::migrated(pool).await
    }

    /// Private in-memory store
    ///
    /// Pinned to a single connection that never idles out, as the database lives only as long as
    /// its connection does.
    #[cfg(test)]
    pub async fn memory() -> Result<Self, sqlx::Error> {
        let opts = SqliteConnectOptions::new().filename(":memory:");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }

    /// Inserts the record unless the username is already taken.
    ///
    /// Returns `false` if a record with this username exists. Uniqueness is left to the primary
    /// key, so two concurrent inserts of the same username can't both succeed.
    pub async fn insert(&self, user: &User) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("insert into users(username, password_hash) values (?, ?)")
            .bind(&user.username)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                debug!(username = %user.username, "Username already stored");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Looks a record up by username
    pub async fn find(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<(String, String)> =
            sqlx::query_as("select username, password_hash from users where username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(username, password_hash)| User {
            username,
            password_hash,
        }))
    }
}
