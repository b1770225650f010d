//! Refresh token repository backing web sessions.
//!
//! Access tokens are stateless JWTs; refresh tokens live here so that a
//! logout can revoke the session.

use chrono::{Duration, Utc};

use super::DbPool;
use crate::{FilecabError, Result};

/// Timestamp layout shared with SQLite's `datetime('now')`.
const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// Refresh token record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    /// Token ID.
    pub id: i64,
    /// Owning user ID.
    pub user_id: i64,
    /// Opaque token string.
    pub token: String,
    /// Expiration timestamp (UTC, SQLite format).
    pub expires_at: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Revocation timestamp (None while active).
    pub revoked_at: Option<String>,
}

/// New refresh token for creation.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    /// Owning user ID.
    pub user_id: i64,
    /// Opaque token string.
    pub token: String,
    /// Expiration timestamp (UTC, SQLite format).
    pub expires_at: String,
}

impl NewRefreshToken {
    /// Create a token that expires `ttl` from now.
    pub fn expiring_in(user_id: i64, token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            user_id,
            token: token.into(),
            expires_at: (Utc::now() + ttl).format(SQLITE_DATETIME).to_string(),
        }
    }
}

/// Repository for refresh token operations.
pub struct RefreshTokenRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RefreshTokenRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a new refresh token.
    pub async fn create(&self, new_token: &NewRefreshToken) -> Result<RefreshToken> {
        let result =
            sqlx::query("INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?)")
                .bind(new_token.user_id)
                .bind(&new_token.token)
                .bind(&new_token.expires_at)
                .execute(self.pool)
                .await?;

        let id = result.last_insert_rowid();
        sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| FilecabError::NotFound("refresh token".to_string()))
    }

    /// Look up a token regardless of state.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(result)
    }

    /// Get a token that is neither expired nor revoked.
    pub async fn get_valid_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM refresh_tokens
             WHERE token = ? AND revoked_at IS NULL AND expires_at > datetime('now')",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(result)
    }

    /// Revoke a token owned by `user_id`.
    ///
    /// Returns false when the token is unknown, foreign or already revoked.
    pub async fn revoke(&self, token: &str, user_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = datetime('now')
             WHERE token = ? AND user_id = ? AND revoked_at IS NULL",
        )
        .bind(token)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomically revoke `old` and store `replacement`.
    ///
    /// Returns `Auth` if `old` was already revoked, so a refresh token can be
    /// exchanged only once.
    pub async fn rotate(&self, old: &str, replacement: &NewRefreshToken) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = datetime('now')
             WHERE token = ? AND user_id = ? AND revoked_at IS NULL",
        )
        .bind(old)
        .bind(replacement.user_id)
        .execute(&mut *tx)
        .await?;

        if revoked.rows_affected() == 0 {
            return Err(FilecabError::Auth("refresh token already used".to_string()));
        }

        sqlx::query("INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?)")
            .bind(replacement.user_id)
            .bind(&replacement.token)
            .bind(&replacement.expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete expired and revoked tokens.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens
             WHERE expires_at < datetime('now') OR revoked_at IS NOT NULL",
        )
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::query("INSERT INTO users (username, password) VALUES ('alice', 'x'), ('bob', 'x')")
            .execute(db.pool())
            .await
            .unwrap();
        db
    }

    fn token(user_id: i64, value: &str, expires_at: &str) -> NewRefreshToken {
        NewRefreshToken {
            user_id,
            token: value.to_string(),
            expires_at: expires_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_expiring_in_is_valid() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&NewRefreshToken::expiring_in(1, "fresh", Duration::days(1)))
            .await
            .unwrap();

        assert!(repo.get_valid_token("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_token_is_invalid() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&token(1, "stale", "2000-01-01 00:00:00"))
            .await
            .unwrap();

        assert!(repo.get_valid_token("stale").await.unwrap().is_none());
        assert!(repo.get_by_token("stale").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_revoke_only_own_token() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&token(1, "alice-token", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        assert!(!repo.revoke("alice-token", 2).await.unwrap());
        assert!(repo.revoke("alice-token", 1).await.unwrap());
        assert!(!repo.revoke("alice-token", 1).await.unwrap());
        assert!(repo.get_valid_token("alice-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rotate_once() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&token(1, "first", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        repo.rotate("first", &token(1, "second", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        assert!(repo.get_valid_token("first").await.unwrap().is_none());
        assert!(repo.get_valid_token("second").await.unwrap().is_some());

        let replay = repo
            .rotate("first", &token(1, "third", "2099-12-31 23:59:59"))
            .await;
        assert!(matches!(replay, Err(FilecabError::Auth(_))));
        assert!(repo.get_by_token("third").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let db = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        repo.create(&token(1, "old", "2000-01-01 00:00:00"))
            .await
            .unwrap();
        repo.create(&token(1, "revoked", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.create(&token(1, "valid", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.revoke("revoked", 1).await.unwrap();

        assert_eq!(repo.cleanup_expired().await.unwrap(), 2);
        assert!(repo.get_by_token("valid").await.unwrap().is_some());
    }
}
