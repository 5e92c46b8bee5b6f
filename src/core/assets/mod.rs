//! Asset Record Module
//!
//! Derived-artifact records written by job handlers after generation
//! succeeds. This is the secondary persistence collaborator: a failed
//! write here degrades a job's result but never fails the job.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::{AssetId, CoreError, CoreResult, JobId};

// =============================================================================
// Asset Records
// =============================================================================

/// Kind of generated artifact a record points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Generated image
    Image,
    /// Generated video clip
    Video,
    /// Generated widget definition
    Widget,
    /// Trained LoRA model
    LoraModel,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Image => write!(f, "image"),
            AssetKind::Video => write!(f, "video"),
            AssetKind::Widget => write!(f, "widget"),
            AssetKind::LoraModel => write!(f, "lora_model"),
        }
    }
}

/// Persistent record of one generated artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Record ID
    pub id: AssetId,
    /// Artifact kind
    pub kind: AssetKind,
    /// Where the artifact lives (URL or provider handle)
    pub uri: String,
    /// Job that produced the artifact
    pub job_id: JobId,
    /// Creation timestamp (RFC3339)
    pub created_at: String,
    /// Kind-specific extras (dimensions, duration, model name, …)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AssetRecord {
    /// Creates a record with a fresh ID
    pub fn new(kind: AssetKind, uri: impl Into<String>, job_id: impl Into<JobId>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind,
            uri: uri.into(),
            job_id: job_id.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            metadata: HashMap::new(),
        }
    }

    /// Attaches a metadata entry
    pub fn with_metadata<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), v);
        }
        self
    }
}

// =============================================================================
// Asset Store
// =============================================================================

/// Persistence seam for asset records
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Persists a record; rejects duplicate IDs
    async fn save_record(&self, record: AssetRecord) -> CoreResult<AssetId>;

    /// Fetches a record by ID
    async fn get_record(&self, asset_id: &str) -> CoreResult<Option<AssetRecord>>;

    /// Lists records produced by one job
    async fn records_for_job(&self, job_id: &str) -> CoreResult<Vec<AssetRecord>>;
}

/// In-memory asset store for tests and single-process embeddings
#[derive(Default)]
pub struct InMemoryAssetStore {
    records: RwLock<HashMap<AssetId, AssetRecord>>,
}

impl InMemoryAssetStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn save_record(&self, record: AssetRecord) -> CoreResult<AssetId> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(CoreError::DuplicateAsset(record.id));
        }
        let asset_id = record.id.clone();
        records.insert(asset_id.clone(), record);
        Ok(asset_id)
    }

    async fn get_record(&self, asset_id: &str) -> CoreResult<Option<AssetRecord>> {
        Ok(self.records.read().await.get(asset_id).cloned())
    }

    async fn records_for_job(&self, job_id: &str) -> CoreResult<Vec<AssetRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_get() {
        let store = InMemoryAssetStore::new();
        let record = AssetRecord::new(AssetKind::Image, "https://cdn/img.png", "job_001")
            .with_metadata("width", 1024);

        let asset_id = store.save_record(record).await.unwrap();

        let fetched = store.get_record(&asset_id).await.unwrap().unwrap();
        assert_eq!(fetched.kind, AssetKind::Image);
        assert_eq!(fetched.uri, "https://cdn/img.png");
        assert_eq!(fetched.metadata["width"], 1024);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = InMemoryAssetStore::new();
        let record = AssetRecord::new(AssetKind::Video, "https://cdn/v.mp4", "job_001");
        let duplicate = record.clone();

        store.save_record(record).await.unwrap();
        let err = store.save_record(duplicate).await.unwrap_err();
        assert!(matches!(err, CoreError::DuplicateAsset(_)));
    }

    #[tokio::test]
    async fn test_records_for_job() {
        let store = InMemoryAssetStore::new();
        store
            .save_record(AssetRecord::new(AssetKind::Image, "a", "job_a"))
            .await
            .unwrap();
        store
            .save_record(AssetRecord::new(AssetKind::Widget, "b", "job_a"))
            .await
            .unwrap();
        store
            .save_record(AssetRecord::new(AssetKind::Video, "c", "job_b"))
            .await
            .unwrap();

        let records = store.records_for_job("job_a").await.unwrap();
        assert_eq!(records.len(), 2);
    }
}
