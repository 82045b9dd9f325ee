//! Artifact storage for finished videos.
//!
//! This crate provides:
//! - The `ArtifactStore` contract (`store(path) -> reference`)
//! - A local-directory store with optional public URL references

pub mod error;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::{artifact_key, ArtifactRef, ArtifactStore, LocalArtifactStore, LocalStoreConfig};
