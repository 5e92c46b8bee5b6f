//! Video Generation Handler

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::assets::{AssetKind, AssetRecord, AssetStore};
use crate::core::generative::{GenerativeProvider, VideoGenerationParams};
use crate::core::jobs::{
    JobEnvelope, JobHandler, JobOutput, JobPayload, ProgressReporter, VideoGenerationPayload,
};
use crate::core::{AssetId, CoreError, CoreResult};

/// Terminal result of a video generation job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoJobResult {
    /// URL of the generated clip
    pub video_url: String,
    /// Clip length in seconds
    pub duration_sec: f32,
    /// Model that produced the clip
    pub model_used: String,
    /// Linked asset record, absent when the record write failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
}

/// Executes `ai:video` jobs against a generative provider
pub struct VideoGenerationHandler {
    provider: Arc<dyn GenerativeProvider>,
    assets: Arc<dyn AssetStore>,
}

impl VideoGenerationHandler {
    /// Creates a handler over the given collaborators
    pub fn new(provider: Arc<dyn GenerativeProvider>, assets: Arc<dyn AssetStore>) -> Self {
        Self { provider, assets }
    }
}

#[async_trait]
impl JobHandler<VideoGenerationPayload> for VideoGenerationHandler {
    type Output = VideoJobResult;

    fn name(&self) -> &str {
        "video-generation"
    }

    async fn handle(
        &self,
        job: &JobEnvelope<VideoGenerationPayload>,
        progress: ProgressReporter,
    ) -> CoreResult<JobOutput<VideoJobResult>> {
        progress.report(5, "Validating request");
        job.payload.validate().map_err(CoreError::ValidationError)?;

        let mut params = match &job.payload.reference_image_url {
            Some(image_url) => VideoGenerationParams::from_image(&job.payload.prompt, image_url),
            None => VideoGenerationParams::new(&job.payload.prompt),
        };
        if let Some(duration) = job.payload.duration_sec {
            params.duration_sec = duration;
        }
        params.model_id = job.payload.model_id.clone();

        progress.report(10, "Generating video");
        let generated = self.provider.generate_video(&params).await?;

        progress.report(90, "Saving asset record");
        let record = AssetRecord::new(AssetKind::Video, &generated.video_url, &job.id)
            .with_metadata("canvasId", &job.payload.canvas_id)
            .with_metadata("durationSec", generated.duration_sec)
            .with_metadata("model", &generated.model_used);

        let result = VideoJobResult {
            video_url: generated.video_url,
            duration_sec: generated.duration_sec,
            model_used: generated.model_used,
            asset_id: None,
        };

        let output = match self.assets.save_record(record).await {
            Ok(asset_id) => JobOutput::ok(VideoJobResult {
                asset_id: Some(asset_id),
                ..result
            }),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Asset record write failed for generated video");
                JobOutput::degraded(result, e.to_string())
            }
        };

        progress.report(100, "Done");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assets::InMemoryAssetStore;
    use crate::core::generative::MockGenerativeProvider;
    use crate::core::jobs::handlers::testing::RejectingAssetStore;

    fn payload() -> VideoGenerationPayload {
        VideoGenerationPayload {
            canvas_id: "canvas_001".to_string(),
            prompt: "waves at dusk".to_string(),
            duration_sec: Some(8.0),
            reference_image_url: None,
            model_id: None,
        }
    }

    fn envelope() -> JobEnvelope<VideoGenerationPayload> {
        JobEnvelope::new(VideoGenerationPayload::default_queue(), payload())
    }

    fn reporter() -> ProgressReporter {
        crate::core::jobs::ProgressChannel::new(8).reporter()
    }

    #[tokio::test]
    async fn test_success_links_asset_record() {
        let store = Arc::new(InMemoryAssetStore::new());
        let handler = VideoGenerationHandler::new(
            Arc::new(MockGenerativeProvider::new("mock")),
            store.clone(),
        );

        let output = handler.handle(&envelope(), reporter()).await.unwrap();

        assert!(!output.auxiliary.is_degraded());
        assert!(output.primary.video_url.starts_with("mock://videos/"));
        assert_eq!(output.primary.duration_sec, 8.0);
        assert!(output.primary.asset_id.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_record_yields_url_without_asset_id() {
        let handler = VideoGenerationHandler::new(
            Arc::new(MockGenerativeProvider::new("mock")),
            Arc::new(RejectingAssetStore),
        );

        let output = handler.handle(&envelope(), reporter()).await.unwrap();

        // The clip was generated; only the record link is missing
        assert!(output.auxiliary.is_degraded());
        assert!(!output.primary.video_url.is_empty());
        assert!(output.primary.asset_id.is_none());

        // The serialized result simply omits assetId
        let json = serde_json::to_value(&output.primary).unwrap();
        assert!(json.get("videoUrl").is_some());
        assert!(json.get("assetId").is_none());
    }

    #[tokio::test]
    async fn test_image_to_video_uses_reference() {
        let mut with_reference = payload();
        with_reference.reference_image_url = Some("https://cdn/ref.png".to_string());
        let job = JobEnvelope::new(VideoGenerationPayload::default_queue(), with_reference);

        let handler = VideoGenerationHandler::new(
            Arc::new(MockGenerativeProvider::new("mock")),
            Arc::new(InMemoryAssetStore::new()),
        );

        let output = handler.handle(&job, reporter()).await.unwrap();
        assert!(!output.primary.video_url.is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let handler = VideoGenerationHandler::new(
            Arc::new(MockGenerativeProvider::new("mock").failing_with("render farm down")),
            Arc::new(InMemoryAssetStore::new()),
        );

        let err = handler.handle(&envelope(), reporter()).await.unwrap_err();
        assert!(matches!(err, CoreError::GenerationFailed(_)));
    }
}
