//! Image Generation Handler

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::assets::{AssetKind, AssetRecord, AssetStore};
use crate::core::generative::{GenerativeProvider, ImageGenerationParams};
use crate::core::jobs::{
    ImageGenerationPayload, JobEnvelope, JobHandler, JobOutput, JobPayload, ProgressReporter,
};
use crate::core::{AssetId, CoreError, CoreResult};

/// Terminal result of an image generation job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageJobResult {
    /// URL of the generated image
    pub image_url: String,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Model that produced the image
    pub model_used: String,
    /// Linked asset record, absent when the record write failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
}

/// Executes `ai:image` jobs against a generative provider
pub struct ImageGenerationHandler {
    provider: Arc<dyn GenerativeProvider>,
    assets: Arc<dyn AssetStore>,
}

impl ImageGenerationHandler {
    /// Creates a handler over the given collaborators
    pub fn new(provider: Arc<dyn GenerativeProvider>, assets: Arc<dyn AssetStore>) -> Self {
        Self { provider, assets }
    }
}

#[async_trait]
impl JobHandler<ImageGenerationPayload> for ImageGenerationHandler {
    type Output = ImageJobResult;

    fn name(&self) -> &str {
        "image-generation"
    }

    async fn handle(
        &self,
        job: &JobEnvelope<ImageGenerationPayload>,
        progress: ProgressReporter,
    ) -> CoreResult<JobOutput<ImageJobResult>> {
        progress.report(5, "Validating request");
        job.payload.validate().map_err(CoreError::ValidationError)?;

        let mut params = ImageGenerationParams::new(&job.payload.prompt);
        params.negative_prompt = job.payload.negative_prompt.clone();
        params.width = job.payload.width;
        params.height = job.payload.height;
        params.model_id = job.payload.model_id.clone();

        progress.report(15, "Generating image");
        let generated = self.provider.generate_image(&params).await?;

        progress.report(85, "Saving asset record");
        let record = AssetRecord::new(AssetKind::Image, &generated.image_url, &job.id)
            .with_metadata("canvasId", &job.payload.canvas_id)
            .with_metadata("width", generated.width)
            .with_metadata("height", generated.height)
            .with_metadata("model", &generated.model_used);

        let result = ImageJobResult {
            image_url: generated.image_url,
            width: generated.width,
            height: generated.height,
            model_used: generated.model_used,
            asset_id: None,
        };

        // The image exists either way; a record failure degrades the
        // result instead of failing the job.
        let output = match self.assets.save_record(record).await {
            Ok(asset_id) => JobOutput::ok(ImageJobResult {
                asset_id: Some(asset_id),
                ..result
            }),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Asset record write failed for generated image");
                JobOutput::degraded(result, e.to_string())
            }
        };

        progress.report(100, "Done");
        Ok(output)
    }
}
