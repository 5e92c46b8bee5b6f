//! Remote Generation Gateway Provider
//!
//! HTTP implementation of `GenerativeProvider` against the generation
//! gateway the web application deploys in front of its AI vendors. Only
//! compiled with the `ai-providers` feature.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::{CoreError, CoreResult};

use super::image::{ImageGenerationParams, ImageGenerationResult};
use super::lora::{LoraTrainingParams, LoraTrainingResult};
use super::providers::{GenerativeProvider, GenerativeProviderConfig, ProviderCapability};
use super::video::{VideoGenerationParams, VideoGenerationResult};
use super::widget::{WidgetGenerationParams, WidgetGenerationResult};

// =============================================================================
// Remote Provider
// =============================================================================

/// Provider backed by an HTTP generation gateway
#[derive(Debug)]
pub struct RemoteGenerativeProvider {
    /// Provider name for logs and registry lookup
    name: String,
    /// Gateway base URL
    base_url: String,
    /// API key sent as bearer auth
    api_key: String,
    /// Capabilities the gateway was configured with
    capabilities: Vec<ProviderCapability>,
    /// HTTP client
    client: reqwest::Client,
}

impl RemoteGenerativeProvider {
    /// Creates a gateway provider from config. API key and base URL are
    /// both required.
    pub fn new(name: impl Into<String>, config: GenerativeProviderConfig) -> CoreResult<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| CoreError::ValidationError("gateway API key is required".to_string()))?;
        if api_key.is_empty() {
            return Err(CoreError::ValidationError(
                "gateway API key cannot be empty".to_string(),
            ));
        }

        let base_url = config
            .base_url
            .ok_or_else(|| CoreError::ValidationError("gateway base URL is required".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_sec))
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            capabilities: vec![
                ProviderCapability::ImageGeneration,
                ProviderCapability::VideoGeneration,
                ProviderCapability::WidgetGeneration,
                ProviderCapability::LoraTraining,
            ],
            client,
        })
    }

    /// Restricts the advertised capabilities
    pub fn with_capabilities(mut self, caps: Vec<ProviderCapability>) -> Self {
        self.capabilities = caps;
        self
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> CoreResult<Resp> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::Timeout(format!("gateway request to {path} timed out"))
                } else if e.is_connect() {
                    CoreError::ProviderUnavailable(format!("gateway unreachable: {e}"))
                } else {
                    CoreError::GenerationFailed(format!("gateway request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::GenerationFailed(format!(
                "gateway returned {status}: {body}"
            )));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| CoreError::GenerationFailed(format!("invalid gateway response: {e}")))
    }
}

// =============================================================================
// Gateway Wire Types
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    id: String,
    url: String,
    mime_type: String,
    width: u32,
    height: u32,
    model: String,
    elapsed_ms: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoRequest<'a> {
    prompt: &'a str,
    mode: &'a str,
    duration_sec: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    id: String,
    url: String,
    duration_sec: f32,
    model: String,
    elapsed_ms: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WidgetRequest<'a> {
    prompt: &'a str,
    capabilities: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WidgetResponse {
    id: String,
    definition: serde_json::Value,
    matched_capabilities: Vec<String>,
    model: String,
    elapsed_ms: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoraRequest<'a> {
    model_name: &'a str,
    training_image_urls: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    base_model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoraResponse {
    id: String,
    training_handle: String,
    base_model: String,
    steps: u32,
}

// =============================================================================
// Provider Implementation
// =============================================================================

#[async_trait]
impl GenerativeProvider for RemoteGenerativeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Vec<ProviderCapability> {
        self.capabilities.clone()
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty() && !self.base_url.is_empty()
    }

    async fn generate_image(
        &self,
        params: &ImageGenerationParams,
    ) -> CoreResult<ImageGenerationResult> {
        let request = ImageRequest {
            prompt: &params.prompt,
            negative_prompt: params.negative_prompt.as_deref(),
            width: params.width,
            height: params.height,
            model: params.model_id.as_deref(),
        };

        let response: ImageResponse = self.post_json("/v1/images", &request).await?;

        Ok(ImageGenerationResult {
            id: response.id,
            prompt: params.prompt.clone(),
            image_url: response.url,
            mime_type: response.mime_type,
            width: response.width,
            height: response.height,
            model_used: response.model,
            generation_time_ms: response.elapsed_ms,
            metadata: HashMap::new(),
        })
    }

    async fn generate_video(
        &self,
        params: &VideoGenerationParams,
    ) -> CoreResult<VideoGenerationResult> {
        let mode = match params.mode {
            super::video::VideoGenMode::TextToVideo => "text_to_video",
            super::video::VideoGenMode::ImageToVideo => "image_to_video",
        };
        let request = VideoRequest {
            prompt: &params.prompt,
            mode,
            duration_sec: params.duration_sec,
            reference_image_url: params.reference_image_url.as_deref(),
            model: params.model_id.as_deref(),
        };

        let response: VideoResponse = self.post_json("/v1/videos", &request).await?;

        Ok(VideoGenerationResult {
            id: response.id,
            video_url: response.url,
            duration_sec: response.duration_sec,
            model_used: response.model,
            generation_time_ms: response.elapsed_ms,
        })
    }

    async fn generate_widget(
        &self,
        params: &WidgetGenerationParams,
    ) -> CoreResult<WidgetGenerationResult> {
        let request = WidgetRequest {
            prompt: &params.prompt,
            capabilities: &params.capabilities,
        };

        let response: WidgetResponse = self.post_json("/v1/widgets", &request).await?;

        Ok(WidgetGenerationResult {
            id: response.id,
            definition: response.definition,
            matched_capabilities: response.matched_capabilities,
            model_used: response.model,
            generation_time_ms: response.elapsed_ms,
        })
    }

    async fn train_lora(&self, params: &LoraTrainingParams) -> CoreResult<LoraTrainingResult> {
        let request = LoraRequest {
            model_name: &params.model_name,
            training_image_urls: &params.training_image_urls,
            base_model: params.base_model.as_deref(),
            steps: params.steps,
        };

        let response: LoraResponse = self.post_json("/v1/loras", &request).await?;

        Ok(LoraTrainingResult {
            id: response.id,
            training_handle: response.training_handle,
            model_name: params.model_name.clone(),
            base_model: response.base_model,
            steps: response.steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GenerativeProviderConfig {
        let mut config = GenerativeProviderConfig::with_api_key("sk-test");
        config.base_url = Some("https://gateway.example.com/".to_string());
        config
    }

    #[test]
    fn test_requires_api_key() {
        let mut config = GenerativeProviderConfig::default();
        config.base_url = Some("https://gateway.example.com".to_string());

        let err = RemoteGenerativeProvider::new("gateway", config).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn test_requires_base_url() {
        let config = GenerativeProviderConfig::with_api_key("sk-test");
        let err = RemoteGenerativeProvider::new("gateway", config).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn test_trims_trailing_slash() {
        let provider = RemoteGenerativeProvider::new("gateway", config()).unwrap();
        assert_eq!(provider.base_url, "https://gateway.example.com");
        assert!(provider.is_available());
    }

    #[test]
    fn test_capability_restriction() {
        let provider = RemoteGenerativeProvider::new("gateway", config())
            .unwrap()
            .with_capabilities(vec![ProviderCapability::ImageGeneration]);

        assert!(provider.supports(ProviderCapability::ImageGeneration));
        assert!(!provider.supports(ProviderCapability::VideoGeneration));
    }
}
