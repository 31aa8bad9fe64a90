use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::Row;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::app::accounts::{user_from_row, USER_COLUMNS};
use crate::domain::user::User;
use crate::infra::db::Db;

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    session_ttl_hours: u64,
}

impl AuthService {
    pub fn new(db: Db, session_ttl_hours: u64) -> Self {
        Self {
            db,
            session_ttl_hours,
        }
    }

    /// Create a user with the trust defaults: score 100, active, role user.
    /// `None` when the handle or email is already taken.
    pub async fn register(
        &self,
        handle: String,
        email: String,
        password: String,
    ) -> Result<Option<User>> {
        let password_hash = hash_password(&password)?;
        let result = sqlx::query(&format!(
            "INSERT INTO users (handle, email, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(handle)
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.db.pool())
        .await;

        match result {
            Ok(row) => Ok(Some(user_from_row(&row)?)),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn login(&self, identifier: &str, password: &str) -> Result<Option<IssuedSession>> {
        let row = sqlx::query(
            "SELECT id, password_hash FROM users WHERE email = $1 OR handle = $1",
        )
        .bind(identifier)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let user_id: Uuid = row.get("id");
        let password_hash: String = row.get("password_hash");
        if password_hash.is_empty() || !verify_password(password, &password_hash)? {
            return Ok(None);
        }

        let session = self.issue_session(user_id).await?;
        Ok(Some(session))
    }

    pub async fn logout(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(hash_token(token))
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Resolve a bearer token to a live session. Status checks and the
    /// reconcile-on-access pass happen in the extractor, after this.
    pub async fn authenticate(&self, token: &str) -> Result<Option<AuthSession>> {
        let row = sqlx::query(
            "SELECT user_id FROM sessions \
             WHERE token_hash = $1 AND expires_at > now()",
        )
        .bind(hash_token(token))
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| AuthSession {
            user_id: row.get("user_id"),
        }))
    }

    pub async fn get_current_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn issue_session(&self, user_id: Uuid) -> Result<IssuedSession> {
        let token = generate_token();
        let expires_at =
            OffsetDateTime::now_utc() + Duration::hours(self.session_ttl_hours as i64);

        sqlx::query(
            "INSERT INTO sessions (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(self.db.pool())
        .await?;

        Ok(IssuedSession { token, expires_at })
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Tokens are stored hashed so a leaked sessions table cannot be replayed.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
