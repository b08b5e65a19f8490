//! Ownership lookups and image-column updates on community and business rows.

use crate::models::entity::{BucketKind, ImageKind};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntityError {
    #[error("{kind} `{id}` not found")]
    NotFound { kind: BucketKind, id: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type EntityResult<T> = Result<T, EntityError>;

#[derive(Clone)]
pub struct EntityService {
    db: Arc<SqlitePool>,
}

impl EntityService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Owner of the entity, or `None` if no such row exists.
    pub async fn fetch_owner(&self, kind: BucketKind, id: &str) -> EntityResult<Option<String>> {
        let sql = format!(
            "SELECT {owner} FROM {table} WHERE id = ?",
            owner = kind.owner_column(),
            table = kind.table(),
        );
        let owner = sqlx::query_scalar::<_, String>(&sql)
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;
        Ok(owner)
    }

    /// Point the entity's image column at `url` and bump `updated_at`.
    pub async fn set_image_url(
        &self,
        kind: BucketKind,
        image: ImageKind,
        id: &str,
        url: &str,
    ) -> EntityResult<()> {
        let sql = format!(
            "UPDATE {table} SET {column} = ?, updated_at = ? WHERE id = ?",
            table = kind.table(),
            column = image.column(),
        );
        let result = sqlx::query(&sql)
            .bind(url)
            .bind(Utc::now())
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(EntityError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Current value of the entity's image column.
    #[cfg(test)]
    pub async fn image_url(
        &self,
        kind: BucketKind,
        image: ImageKind,
        id: &str,
    ) -> EntityResult<Option<String>> {
        let sql = format!(
            "SELECT {column} FROM {table} WHERE id = ?",
            table = kind.table(),
            column = image.column(),
        );
        sqlx::query_scalar::<_, Option<String>>(&sql)
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or_else(|| EntityError::NotFound {
                kind,
                id: id.to_string(),
            })
    }
}
