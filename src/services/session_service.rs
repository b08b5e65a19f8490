//! Resolves bearer session tokens to user identities.

use crate::models::session::Session;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing session token")]
    Missing,
    #[error("Invalid or expired session")]
    Invalid,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Clone)]
pub struct SessionService {
    db: Arc<SqlitePool>,
}

impl SessionService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Resolve a session token to the user it belongs to.
    ///
    /// `None` or a blank token is `Missing`; an unknown or expired token is
    /// `Invalid`.
    pub async fn resolve(&self, token: Option<&str>) -> SessionResult<String> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::Missing)?;

        let session = sqlx::query_as::<_, Session>(
            "SELECT user_id, expires_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(SessionError::Invalid)?;

        if session.is_expired_at(Utc::now()) {
            debug!(user_id = %session.user_id, "rejected expired session");
            return Err(SessionError::Invalid);
        }

        Ok(session.user_id)
    }
}
