//! User accounts.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::DbPool;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

/// Identity fields safe to hand back to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl User {
    pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn username_or_email_taken(
        pool: &DbPool,
        username: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(pool)
                .await?;
        Ok(count > 0)
    }

    /// Insert a new account. Uniqueness violations surface as
    /// `sqlx::Error::Database`.
    pub async fn create(
        pool: &DbPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let created_at = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(&created_at)
        .execute(pool)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }

    pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    #[tokio::test]
    async fn test_create_and_find() {
        let pool = init_in_memory().await.unwrap();
        let created = User::create(&pool, "grace", "grace@example.com", "h").await.unwrap();

        let by_email = User::find_by_email(&pool, "grace@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_email.username, "grace");

        let by_id = User::find_by_id(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "grace@example.com");

        assert!(User::find_by_email(&pool, "nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_uniqueness() {
        let pool = init_in_memory().await.unwrap();
        User::create(&pool, "grace", "grace@example.com", "h").await.unwrap();

        assert!(User::username_or_email_taken(&pool, "grace", "other@example.com").await.unwrap());
        assert!(User::username_or_email_taken(&pool, "other", "grace@example.com").await.unwrap());
        assert!(!User::username_or_email_taken(&pool, "other", "other@example.com").await.unwrap());

        let dup = User::create(&pool, "grace", "new@example.com", "h").await;
        assert!(matches!(dup, Err(sqlx::Error::Database(_))));
        assert_eq!(User::count(&pool).await.unwrap(), 1);
    }

    #[test]
    fn test_response_hides_password_hash() {
        let user = User {
            id: 3,
            username: "grace".into(),
            email: "grace@example.com".into(),
            password_hash: "secret-hash".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 3, "username": "grace", "email": "grace@example.com"})
        );
    }
}
