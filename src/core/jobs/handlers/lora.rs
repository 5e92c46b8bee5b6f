//! LoRA Training Handler

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::assets::{AssetKind, AssetRecord, AssetStore};
use crate::core::generative::{GenerativeProvider, LoraTrainingParams};
use crate::core::jobs::{
    JobEnvelope, JobHandler, JobOutput, JobPayload, LoraTrainingPayload, ProgressReporter,
};
use crate::core::{AssetId, CoreError, CoreResult, ModelId};

/// Terminal result of a LoRA training job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoraJobResult {
    /// Provider-side handle for polling the training run
    pub training_handle: String,
    /// Name the trained model was registered under
    pub model_name: String,
    /// Base model that was fine-tuned
    pub base_model: ModelId,
    /// Steps the run was submitted with
    pub steps: u32,
    /// Linked model record, absent when the record write failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
}

/// Executes `ai:lora` jobs against a generative provider
pub struct LoraTrainingHandler {
    provider: Arc<dyn GenerativeProvider>,
    assets: Arc<dyn AssetStore>,
}

impl LoraTrainingHandler {
    /// Creates a handler over the given collaborators
    pub fn new(provider: Arc<dyn GenerativeProvider>, assets: Arc<dyn AssetStore>) -> Self {
        Self { provider, assets }
    }
}

#[async_trait]
impl JobHandler<LoraTrainingPayload> for LoraTrainingHandler {
    type Output = LoraJobResult;

    fn name(&self) -> &str {
        "lora-training"
    }

    async fn handle(
        &self,
        job: &JobEnvelope<LoraTrainingPayload>,
        progress: ProgressReporter,
    ) -> CoreResult<JobOutput<LoraJobResult>> {
        progress.report(5, "Validating request");
        job.payload.validate().map_err(CoreError::ValidationError)?;

        let mut params = LoraTrainingParams::new(
            &job.payload.model_name,
            job.payload.training_image_urls.clone(),
        );
        params.base_model = job.payload.base_model.clone();
        params.steps = job.payload.steps;

        progress.report(10, "Submitting training run");
        let submitted = self.provider.train_lora(&params).await?;

        progress.report(90, "Saving model record");
        let record = AssetRecord::new(AssetKind::LoraModel, &submitted.training_handle, &job.id)
            .with_metadata("modelName", &submitted.model_name)
            .with_metadata("baseModel", &submitted.base_model)
            .with_metadata("steps", submitted.steps);

        let result = LoraJobResult {
            training_handle: submitted.training_handle,
            model_name: submitted.model_name,
            base_model: submitted.base_model,
            steps: submitted.steps,
            asset_id: None,
        };

        let output = match self.assets.save_record(record).await {
            Ok(asset_id) => JobOutput::ok(LoraJobResult {
                asset_id: Some(asset_id),
                ..result
            }),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Model record write failed for training run");
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

    fn payload() -> LoraTrainingPayload {
        LoraTrainingPayload {
            model_name: "watercolor-style".to_string(),
            training_image_urls: vec![
                "https://cdn/img1.png".to_string(),
                "https://cdn/img2.png".to_string(),
            ],
            base_model: Some("sd-xl".to_string()),
            steps: Some(1500),
        }
    }

    fn envelope() -> JobEnvelope<LoraTrainingPayload> {
        JobEnvelope::new(LoraTrainingPayload::default_queue(), payload())
    }

    fn reporter() -> ProgressReporter {
        crate::core::jobs::ProgressChannel::new(8).reporter()
    }

    #[tokio::test]
    async fn test_success_registers_model_record() {
        let store = Arc::new(InMemoryAssetStore::new());
        let handler = LoraTrainingHandler::new(
            Arc::new(MockGenerativeProvider::new("mock")),
            store.clone(),
        );

        let output = handler.handle(&envelope(), reporter()).await.unwrap();

        assert!(!output.auxiliary.is_degraded());
        assert!(output.primary.training_handle.starts_with("mock-training/"));
        assert_eq!(output.primary.base_model, "sd-xl");
        assert_eq!(output.primary.steps, 1500);

        let asset_id = output.primary.asset_id.expect("model record linked");
        let record = store.get_record(&asset_id).await.unwrap().unwrap();
        assert_eq!(record.kind, AssetKind::LoraModel);
    }

    #[tokio::test]
    async fn test_record_failure_keeps_training_handle() {
        let handler = LoraTrainingHandler::new(
            Arc::new(MockGenerativeProvider::new("mock")),
            Arc::new(RejectingAssetStore),
        );

        let output = handler.handle(&envelope(), reporter()).await.unwrap();

        assert!(output.auxiliary.is_degraded());
        assert!(output.primary.asset_id.is_none());
        assert!(!output.primary.training_handle.is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let handler = LoraTrainingHandler::new(
            Arc::new(MockGenerativeProvider::new("mock").failing_with("trainer overloaded")),
            Arc::new(InMemoryAssetStore::new()),
        );

        let err = handler.handle(&envelope(), reporter()).await.unwrap_err();
        assert!(matches!(err, CoreError::GenerationFailed(_)));
    }
}
