pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use thiserror::Error;

use crate::model::VerbRecord;

/// What a subscriber sees each time the remote document changes.
/// `received_at` is local metadata, not part of the document.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub exists: bool,
    pub verbs: Vec<VerbRecord>,
    pub received_at: DateTime<Utc>,
}

impl DocumentSnapshot {
    pub fn present(verbs: Vec<VerbRecord>) -> Self {
        Self {
            exists: true,
            verbs,
            received_at: Utc::now(),
        }
    }

    pub fn missing() -> Self {
        Self {
            exists: false,
            verbs: Vec::new(),
            received_at: Utc::now(),
        }
    }
}

pub type SnapshotStream = BoxStream<'static, DocumentSnapshot>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(#[from] ::redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("subscribe error: {0}")]
    Subscribe(::redis::RedisError),

    #[error("publish error: {0}")]
    Publish(::redis::RedisError),
}

/// Remote document store holding one verb list per storage key.
///
/// The whole-document overwrite is the only write primitive; there is no
/// patch or merge, so the last writer observed by the store wins.
#[async_trait]
pub trait VerbStore: Send + Sync {
    /// Opens a live subscription. The stream delivers one snapshot of the
    /// current document up front, then one per change, in store order,
    /// until the stream is dropped.
    async fn subscribe(&self, key: &str) -> Result<SnapshotStream, StoreError>;

    /// Creates the document with `initial` verbs if none exists at `key`.
    /// No-op when the document is already there.
    async fn create_if_absent(&self, key: &str, initial: &[VerbRecord]) -> Result<(), StoreError>;

    /// Replaces the document's verb list entirely.
    async fn overwrite(&self, key: &str, verbs: &[VerbRecord]) -> Result<(), StoreError>;
}
