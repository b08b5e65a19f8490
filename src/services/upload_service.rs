//! Image ingestion: validates an upload, checks ownership of the target
//! entity, writes the payload to the object store and records its public URL.
//!
//! The storage write and the row update are two separate operations. A failed
//! update after a successful write leaves the stored object in place.

use crate::{
    models::{
        entity::{BucketKind, ImageKind},
        image::{ImageContentType, MAX_IMAGE_BYTES, extension_from_filename, object_key},
    },
    services::{
        entity_service::{EntityError, EntityService},
        session_service::SessionError,
        storage_service::{StorageError, StorageService, ensure_key_safe},
    },
};
use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Invalid bucket type: {0}")]
    InvalidBucket(String),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid image type: {0}")]
    InvalidImageKind(String),
    #[error("Image type `{image}` is not supported for {bucket}")]
    ImageKindMismatch { bucket: BucketKind, image: ImageKind },
    #[error(
        "File too large ({size} bytes). Maximum size is {} MB",
        MAX_IMAGE_BYTES / (1024 * 1024)
    )]
    FileTooLarge { size: u64 },
    #[error("Invalid file type `{0}`. Allowed: JPEG, PNG, GIF, WebP")]
    UnsupportedContentType(String),
    #[error("Invalid entity id: {0}")]
    InvalidEntityId(String),
    #[error("Not authorized to update this entity")]
    NotAuthorized,
    #[error("Failed to look up entity: {0}")]
    Lookup(#[source] EntityError),
    #[error("Upload failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Failed to update record: {0}")]
    RecordUpdate(#[source] EntityError),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// The `file` part of an upload request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    /// Total bytes received, which may exceed `data.len()` for oversized files.
    pub size: u64,
    pub data: Bytes,
}

/// Raw multipart fields, before any validation.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub bucket_type: Option<String>,
    pub entity_id: Option<String>,
    pub image_type: Option<String>,
}

/// An upload that passed every input check.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub bucket: BucketKind,
    pub entity_id: String,
    pub image: ImageKind,
    pub content_type: ImageContentType,
    pub key: String,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bucket: BucketKind,
    pub key: String,
    pub image_url: String,
}

/// Check the form fields in request order: bucket kind, required fields and
/// image slot, then file size and content type. Entity ids that cannot form
/// a safe storage key are rejected last.
pub fn validate(form: UploadForm) -> UploadResult<ValidatedUpload> {
    let bucket_type = non_blank(form.bucket_type).ok_or(UploadError::MissingField("bucket_type"))?;
    let bucket: BucketKind = bucket_type
        .parse()
        .map_err(|_| UploadError::InvalidBucket(bucket_type.clone()))?;

    let file = form.file.ok_or(UploadError::MissingField("file"))?;
    let entity_id = non_blank(form.entity_id).ok_or(UploadError::MissingField("entity_id"))?;
    let image_type = non_blank(form.image_type).ok_or(UploadError::MissingField("image_type"))?;

    let image: ImageKind = image_type
        .parse()
        .map_err(|_| UploadError::InvalidImageKind(image_type.clone()))?;
    if bucket.image_kind() != image {
        return Err(UploadError::ImageKindMismatch { bucket, image });
    }

    if file.size > MAX_IMAGE_BYTES {
        return Err(UploadError::FileTooLarge { size: file.size });
    }
    let declared = file.content_type.unwrap_or_default();
    let content_type: ImageContentType = declared
        .parse()
        .map_err(UploadError::UnsupportedContentType)?;

    let extension = extension_from_filename(file.file_name.as_deref());
    let key = object_key(&entity_id, image.as_str(), &extension);
    ensure_key_safe(&key).map_err(|_| UploadError::InvalidEntityId(entity_id.clone()))?;

    Ok(ValidatedUpload {
        bucket,
        entity_id,
        image,
        content_type,
        key,
        data: file.data,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Clone)]
pub struct ImageUploadService {
    entities: EntityService,
    storage: StorageService,
}

impl ImageUploadService {
    pub fn new(entities: EntityService, storage: StorageService) -> Self {
        Self { entities, storage }
    }

    /// Run the full upload for an already authenticated user.
    pub async fn upload(&self, user_id: &str, form: UploadForm) -> UploadResult<UploadedImage> {
        let upload = validate(form).inspect_err(|err| {
            warn!(user_id, error = %err, "rejected image upload");
        })?;

        let owner = self
            .entities
            .fetch_owner(upload.bucket, &upload.entity_id)
            .await
            .map_err(UploadError::Lookup)?;
        if owner.as_deref() != Some(user_id) {
            warn!(
                user_id,
                bucket = %upload.bucket,
                entity_id = %upload.entity_id,
                "image upload denied"
            );
            return Err(UploadError::NotAuthorized);
        }

        let size = upload.data.len();
        self.storage
            .put_object(
                upload.bucket.as_str(),
                &upload.key,
                upload.data,
                upload.content_type.as_mime(),
                true,
            )
            .await?;

        let image_url = self.storage.public_url(upload.bucket.as_str(), &upload.key);

        if let Err(err) = self
            .entities
            .set_image_url(upload.bucket, upload.image, &upload.entity_id, &image_url)
            .await
        {
            warn!(
                bucket = %upload.bucket,
                key = %upload.key,
                error = %err,
                "stored object left orphaned after record update failure"
            );
            return Err(UploadError::RecordUpdate(err));
        }

        info!(
            user_id,
            bucket = %upload.bucket,
            entity_id = %upload.entity_id,
            key = %upload.key,
            size,
            "image uploaded"
        );

        Ok(UploadedImage {
            bucket: upload.bucket,
            key: upload.key,
            image_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_pool, insert_business, insert_community};
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn png(name: &str, len: usize) -> UploadedFile {
        UploadedFile {
            file_name: Some(name.to_string()),
            content_type: Some("image/png".into()),
            size: len as u64,
            data: Bytes::from(vec![0u8; len]),
        }
    }

    fn form(bucket: &str, entity: &str, image: &str, file: UploadedFile) -> UploadForm {
        UploadForm {
            file: Some(file),
            bucket_type: Some(bucket.into()),
            entity_id: Some(entity.into()),
            image_type: Some(image.into()),
        }
    }

    async fn service() -> (ImageUploadService, Arc<SqlitePool>, StorageService, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = create_test_pool().await;
        let storage = StorageService::new(pool.clone(), dir.path(), "http://media.test");
        let uploader = ImageUploadService::new(EntityService::new(pool.clone()), storage.clone());
        (uploader, pool, storage, dir)
    }

    #[test]
    fn validate_builds_deterministic_key() {
        let upload = validate(form("communities", "C1", "cover", png("photo.png", 10))).unwrap();
        assert_eq!(upload.bucket, BucketKind::Communities);
        assert_eq!(upload.image, ImageKind::Cover);
        assert_eq!(upload.key, "C1/cover.png");
    }

    #[test]
    fn validate_defaults_extension_to_jpg() {
        let upload = validate(form("businesses", "B1", "logo", png("logo", 10))).unwrap();
        assert_eq!(upload.key, "B1/logo.jpg");
    }

    #[test]
    fn validate_rejects_unknown_bucket() {
        let err = validate(form("users", "C1", "cover", png("a.png", 1))).unwrap_err();
        assert!(matches!(err, UploadError::InvalidBucket(b) if b == "users"));
    }

    #[test]
    fn validate_reports_missing_fields() {
        let mut f = form("communities", "C1", "cover", png("a.png", 1));
        f.file = None;
        assert!(matches!(validate(f).unwrap_err(), UploadError::MissingField("file")));

        let f = form("communities", " ", "cover", png("a.png", 1));
        assert!(matches!(validate(f).unwrap_err(), UploadError::MissingField("entity_id")));

        let mut f = form("communities", "C1", "cover", png("a.png", 1));
        f.bucket_type = None;
        assert!(matches!(validate(f).unwrap_err(), UploadError::MissingField("bucket_type")));
    }

    #[test]
    fn validate_rejects_unknown_and_mismatched_image_kinds() {
        let err = validate(form("communities", "C1", "banner", png("a.png", 1))).unwrap_err();
        assert!(matches!(err, UploadError::InvalidImageKind(_)));

        let err = validate(form("communities", "C1", "logo", png("a.png", 1))).unwrap_err();
        assert!(matches!(err, UploadError::ImageKindMismatch { .. }));
    }

    #[test]
    fn validate_rejects_oversized_regardless_of_type() {
        let mut file = png("a.gif", 0);
        file.size = MAX_IMAGE_BYTES + 1;
        file.content_type = Some("application/pdf".into());
        let err = validate(form("communities", "C1", "cover", file)).unwrap_err();
        assert!(matches!(err, UploadError::FileTooLarge { .. }));
    }

    #[test]
    fn validate_accepts_exactly_max_size() {
        let mut file = png("a.png", 0);
        file.size = MAX_IMAGE_BYTES;
        assert!(validate(form("communities", "C1", "cover", file)).is_ok());
    }

    #[test]
    fn validate_rejects_disallowed_content_type() {
        let mut file = png("a.svg", 10);
        file.content_type = Some("image/svg+xml".into());
        let err = validate(form("communities", "C1", "cover", file)).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedContentType(t) if t == "image/svg+xml"));

        let mut file = png("a.png", 10);
        file.content_type = None;
        let err = validate(form("communities", "C1", "cover", file)).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedContentType(_)));
    }

    #[test]
    fn validate_rejects_entity_ids_that_escape_the_bucket() {
        for entity in ["../C1", "C1/..", "/C1", "C\\1", "C\n1"] {
            let err = validate(form("communities", entity, "cover", png("a.png", 1))).unwrap_err();
            assert!(matches!(&err, UploadError::InvalidEntityId(id) if id == entity), "id {entity:?}");
        }
    }

    #[tokio::test]
    async fn owned_entity_with_traversal_id_is_rejected_before_lookup() {
        let (uploader, pool, _storage, dir) = service().await;
        insert_community(&pool, "../C1", "U1").await;

        let err = uploader
            .upload("U1", form("communities", "../C1", "cover", png("p.png", 4)))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidEntityId(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn upload_writes_object_and_records_url() {
        let (uploader, pool, storage, _dir) = service().await;
        insert_community(&pool, "C1", "U1").await;

        let uploaded = uploader
            .upload("U1", form("communities", "C1", "cover", png("photo.png", 2_000_000)))
            .await
            .unwrap();
        assert_eq!(uploaded.key, "C1/cover.png");
        assert_eq!(uploaded.image_url, "http://media.test/objects/communities/C1/cover.png");
        assert!(storage.object_path("communities", "C1/cover.png").exists());

        let stored = EntityService::new(pool)
            .image_url(BucketKind::Communities, ImageKind::Cover, "C1")
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some(uploaded.image_url.as_str()));
    }

    #[tokio::test]
    async fn repeated_upload_is_idempotent() {
        let (uploader, pool, _storage, _dir) = service().await;
        insert_business(&pool, "B1", "U1").await;

        let first = uploader
            .upload("U1", form("businesses", "B1", "logo", png("a.webp", 8)))
            .await
            .unwrap();
        let second = uploader
            .upload("U1", form("businesses", "B1", "logo", png("a.webp", 8)))
            .await
            .unwrap();
        assert_eq!(first.key, second.key);
        assert_eq!(first.image_url, second.image_url);

        let objects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM objects")
            .fetch_one(&*pool)
            .await
            .unwrap();
        assert_eq!(objects, 1);
    }

    #[tokio::test]
    async fn foreign_and_missing_entities_are_both_unauthorized() {
        let (uploader, pool, storage, _dir) = service().await;
        insert_community(&pool, "C2", "someone-else").await;

        let foreign = uploader
            .upload("U1", form("communities", "C2", "cover", png("p.png", 4)))
            .await
            .unwrap_err();
        let missing = uploader
            .upload("U1", form("communities", "C404", "cover", png("p.png", 4)))
            .await
            .unwrap_err();

        assert!(matches!(foreign, UploadError::NotAuthorized));
        assert!(matches!(missing, UploadError::NotAuthorized));
        assert_eq!(foreign.to_string(), missing.to_string());
        assert!(!storage.object_path("communities", "C2/cover.png").exists());
    }

    #[tokio::test]
    async fn failed_record_update_leaves_object_orphaned() {
        let (uploader, pool, storage, _dir) = service().await;
        insert_community(&pool, "C1", "U1").await;
        sqlx::query(
            "CREATE TRIGGER block_cover BEFORE UPDATE ON communities
             BEGIN SELECT RAISE(ABORT, 'updates disabled'); END",
        )
        .execute(&*pool)
        .await
        .unwrap();

        let err = uploader
            .upload("U1", form("communities", "C1", "cover", png("p.png", 4)))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::RecordUpdate(_)));
        assert!(storage.object_path("communities", "C1/cover.png").exists());
    }

    #[tokio::test]
    async fn storage_failure_skips_record_update() {
        let dir = TempDir::new().unwrap();
        let pool = create_test_pool().await;
        insert_community(&pool, "C1", "U1").await;
        // a regular file where the storage root should be makes every write fail
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"").unwrap();
        let storage = StorageService::new(pool.clone(), &blocked, "http://media.test");
        let uploader = ImageUploadService::new(EntityService::new(pool.clone()), storage);

        let err = uploader
            .upload("U1", form("communities", "C1", "cover", png("p.png", 4)))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Storage(_)));

        let stored = EntityService::new(pool)
            .image_url(BucketKind::Communities, ImageKind::Cover, "C1")
            .await
            .unwrap();
        assert_eq!(stored, None);
    }
}
