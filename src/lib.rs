//! scene-sync — change-data-capture bridge between a source document store
//! and a search backend.
//!
//! The watcher consumes an ordered mutation feed, derives scene-level and
//! content-level search records from completed video documents, and applies
//! idempotent upserts/deletes against the configured backend. A persisted
//! resume token makes the pipeline restartable; a full-sync pass repairs
//! drift the live path cannot recover on its own.

pub mod application;
pub mod domain;
pub mod infrastructure;
