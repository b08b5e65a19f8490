//! Bearer sessions mapping an opaque token to a user.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Clone, FromRow, Debug)]
pub struct Session {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
