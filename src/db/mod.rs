mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use user::SqliteUserStore;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                // refresh_token holds the single live refresh JWT, NULL when logged out
                "CREATE TABLE users (
                    id TEXT PRIMARY KEY NOT NULL,
                    username TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    password_digest TEXT NOT NULL,
                    refresh_token TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_users_username ON users(username)",
            ],
        )
        .await
    }

    /// Get the user store.
    pub fn users(&self) -> SqliteUserStore {
        SqliteUserStore::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{StoreError, UserStore};

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();

        let created = db.users().create("alice", "digest").await.unwrap();
        assert_eq!(created.username, "alice");
        assert_eq!(created.password_digest, "digest");
        assert!(created.current_refresh_token.is_none());

        let user = db.users().find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.id, created.id);

        let user = db.users().find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_unknown_user_is_none() {
        let db = Database::open(":memory:").await.unwrap();

        assert!(db.users().find_by_id("nope").await.unwrap().is_none());
        assert!(db.users().find_by_username("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_taken() {
        let db = Database::open(":memory:").await.unwrap();

        db.users().create("alice", "d1").await.unwrap();
        let result = db.users().create("alice", "d2").await;
        assert!(matches!(result, Err(StoreError::UsernameTaken)));

        // Usernames are case-insensitive
        let result = db.users().create("ALICE", "d3").await;
        assert!(matches!(result, Err(StoreError::UsernameTaken)));
    }

    #[tokio::test]
    async fn test_compare_and_swap_refresh_token() {
        let db = Database::open(":memory:").await.unwrap();
        let users = db.users();
        let id = users.create("alice", "digest").await.unwrap().id;

        users.set_refresh_token(&id, "r1").await.unwrap();

        // Wrong expected value leaves the stored token alone
        assert!(!users.compare_and_swap_refresh_token(&id, "r0", "r2").await.unwrap());
        let stored = users.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.current_refresh_token.as_deref(), Some("r1"));

        assert!(users.compare_and_swap_refresh_token(&id, "r1", "r2").await.unwrap());
        let stored = users.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.current_refresh_token.as_deref(), Some("r2"));

        // The old value can never be swapped again
        assert!(!users.compare_and_swap_refresh_token(&id, "r1", "r3").await.unwrap());
    }

    #[tokio::test]
    async fn test_compare_and_swap_fails_without_session() {
        let db = Database::open(":memory:").await.unwrap();
        let users = db.users();
        let id = users.create("alice", "digest").await.unwrap().id;

        assert!(!users.compare_and_swap_refresh_token(&id, "", "r1").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_refresh_token() {
        let db = Database::open(":memory:").await.unwrap();
        let users = db.users();
        let id = users.create("alice", "digest").await.unwrap().id;

        assert!(!users.clear_refresh_token(&id).await.unwrap());

        users.set_refresh_token(&id, "r1").await.unwrap();
        assert!(users.clear_refresh_token(&id).await.unwrap());
        assert!(users.find_by_id(&id).await.unwrap().unwrap().current_refresh_token.is_none());

        // Second clear has nothing to do
        assert!(!users.clear_refresh_token(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db.users().create("alice", "digest").await.unwrap().id;
        assert!(db.users().delete(&id).await.unwrap());

        assert!(db.users().find_by_id(&id).await.unwrap().is_none());
    }
}
