//! Services backing the HTTP handlers.

pub mod entity_service;
pub mod session_service;
pub mod storage_service;
pub mod upload_service;

use entity_service::EntityService;
use session_service::SessionService;
use sqlx::SqlitePool;
use std::sync::Arc;
use storage_service::StorageService;
use upload_service::ImageUploadService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub storage: StorageService,
    pub uploader: ImageUploadService,
}

impl AppState {
    pub fn new(
        db: Arc<SqlitePool>,
        storage_dir: impl Into<std::path::PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        let storage = StorageService::new(db.clone(), storage_dir, public_base_url);
        let uploader = ImageUploadService::new(EntityService::new(db.clone()), storage.clone());
        Self {
            sessions: SessionService::new(db),
            storage,
            uploader,
        }
    }
}
