//! Widget Generation Handler

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::assets::{AssetKind, AssetRecord, AssetStore};
use crate::core::generative::{GenerativeProvider, WidgetGenerationParams};
use crate::core::jobs::{
    JobEnvelope, JobHandler, JobOutput, JobPayload, ProgressReporter, WidgetGenerationPayload,
};
use crate::core::{AssetId, CoreError, CoreResult, WidgetId};

/// Terminal result of a widget generation job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetJobResult {
    /// ID of the synthesized widget
    pub widget_id: WidgetId,
    /// JSON widget definition for the canvas runtime
    pub definition: serde_json::Value,
    /// Capability tags the provider honored
    pub matched_capabilities: Vec<String>,
    /// Linked asset record, absent when the record write failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
}

/// Executes `ai:widget` jobs against a generative provider
pub struct WidgetGenerationHandler {
    provider: Arc<dyn GenerativeProvider>,
    assets: Arc<dyn AssetStore>,
}

impl WidgetGenerationHandler {
    /// Creates a handler over the given collaborators
    pub fn new(provider: Arc<dyn GenerativeProvider>, assets: Arc<dyn AssetStore>) -> Self {
        Self { provider, assets }
    }
}

#[async_trait]
impl JobHandler<WidgetGenerationPayload> for WidgetGenerationHandler {
    type Output = WidgetJobResult;

    fn name(&self) -> &str {
        "widget-generation"
    }

    async fn handle(
        &self,
        job: &JobEnvelope<WidgetGenerationPayload>,
        progress: ProgressReporter,
    ) -> CoreResult<JobOutput<WidgetJobResult>> {
        progress.report(5, "Validating request");
        job.payload.validate().map_err(CoreError::ValidationError)?;

        let mut params = WidgetGenerationParams::new(&job.payload.prompt);
        if let Some(caps) = &job.payload.capabilities {
            params.capabilities = caps.clone();
        }

        progress.report(20, "Synthesizing widget");
        let generated = self.provider.generate_widget(&params).await?;

        progress.report(85, "Saving asset record");
        let record = AssetRecord::new(
            AssetKind::Widget,
            format!("widget://{}", generated.id),
            &job.id,
        )
        .with_metadata("canvasId", &job.payload.canvas_id)
        .with_metadata("capabilities", &generated.matched_capabilities);

        let result = WidgetJobResult {
            widget_id: generated.id,
            definition: generated.definition,
            matched_capabilities: generated.matched_capabilities,
            asset_id: None,
        };

        let output = match self.assets.save_record(record).await {
            Ok(asset_id) => JobOutput::ok(WidgetJobResult {
                asset_id: Some(asset_id),
                ..result
            }),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Asset record write failed for generated widget");
                JobOutput::degraded(result, e.to_string())
            }
        };

        progress.report(100, "Done");
        Ok(output)
    }
}
