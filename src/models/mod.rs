//! Core data models for the image ingestion service.
//!
//! Rows map to SQLite tables via `sqlx::FromRow`; the entity and image enums
//! are the closed sets the upload path validates against.

pub mod entity;
pub mod image;
pub mod object;
pub mod session;
