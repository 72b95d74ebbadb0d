use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use crate::session::{StoreError, User, UserStore};

/// SQLite-backed user store.
#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    password_digest: String,
    refresh_token: Option<String>,
    created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password_digest: row.password_digest,
            current_refresh_token: row.refresh_token,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str = "id, username, password_digest, refresh_token, created_at";

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, column: &str, value: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    /// Delete a user by ID.
    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn create(&self, username: &str, password_digest: &str) -> Result<User, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();

        let result = sqlx::query("INSERT INTO users (id, username, password_digest) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(username)
            .bind(password_digest)
            .execute(&self.pool)
            .await;

        if let Err(e) = result {
            let unique = e
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation());
            return Err(if unique {
                StoreError::UsernameTaken
            } else {
                backend(e)
            });
        }

        self.fetch_where("id", &id)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::Backend("created user not found".into()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.fetch_where("id", id).await.map_err(backend)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.fetch_where("username", username).await.map_err(backend)
    }

    async fn set_refresh_token(&self, id: &str, token: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn compare_and_swap_refresh_token(
        &self,
        id: &str,
        expected: &str,
        new_token: &str,
    ) -> Result<bool, StoreError> {
        // Single statement, so the compare and the write cannot interleave
        // with another writer.
        let result =
            sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ? AND refresh_token = ?")
                .bind(new_token)
                .bind(id)
                .bind(expected)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_token(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = NULL WHERE id = ? AND refresh_token IS NOT NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }
}
