//! Shared fixtures for unit and HTTP tests.

use crate::{routes::routes::app, services::AppState};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempDir;
use uuid::Uuid;

pub const TEST_PUBLIC_BASE_URL: &str = "http://media.test";
const TEST_MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

/// In-memory SQLite with the schema applied.
///
/// A single connection that never idles out, so every query sees the same
/// in-memory database.
pub async fn create_test_pool() -> Arc<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("connect in-memory sqlite");
    crate::run_migrations(&pool).await.expect("apply schema");
    Arc::new(pool)
}

pub struct TestApp {
    pub server: TestServer,
    pub pool: Arc<SqlitePool>,
    pub state: AppState,
    storage_dir: TempDir,
}

impl TestApp {
    pub fn storage_root(&self) -> &Path {
        self.storage_dir.path()
    }

    pub fn storage_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.state.storage.object_path(bucket, key)
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_limit(TEST_MAX_REQUEST_BYTES).await
}

/// Like `create_test_app`, with a custom whole-request body limit.
pub async fn create_test_app_with_limit(max_request_bytes: usize) -> TestApp {
    let pool = create_test_pool().await;
    let storage_dir = TempDir::new().expect("create storage dir");
    let state = AppState::new(pool.clone(), storage_dir.path(), TEST_PUBLIC_BASE_URL);
    let server = TestServer::new(app(state.clone(), max_request_bytes)).expect("test server");
    TestApp {
        server,
        pool,
        state,
        storage_dir,
    }
}

/// Insert a session for `user_id` expiring `ttl` from now; returns its token.
pub async fn insert_session(pool: &SqlitePool, user_id: &str, ttl: Duration) -> String {
    let token = Uuid::new_v4().to_string();
    let now = Utc::now();
    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(now)
        .bind(now + ttl)
        .execute(pool)
        .await
        .expect("insert session");
    token
}

pub async fn insert_community(pool: &SqlitePool, id: &str, created_by: &str) {
    sqlx::query("INSERT INTO communities (id, name, created_by) VALUES (?, ?, ?)")
        .bind(id)
        .bind(format!("Community {id}"))
        .bind(created_by)
        .execute(pool)
        .await
        .expect("insert community");
}

pub async fn insert_business(pool: &SqlitePool, id: &str, owner_id: &str) {
    sqlx::query("INSERT INTO businesses (id, name, owner_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(format!("Business {id}"))
        .bind(owner_id)
        .execute(pool)
        .await
        .expect("insert business");
}
