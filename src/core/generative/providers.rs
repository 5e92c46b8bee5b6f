//! Generative AI Providers
//!
//! Provider abstraction for the external generation services.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::{CoreError, CoreResult};

use super::image::{ImageGenerationParams, ImageGenerationResult};
use super::lora::{LoraTrainingParams, LoraTrainingResult};
use super::video::{VideoGenerationParams, VideoGenerationResult};
use super::widget::{WidgetGenerationParams, WidgetGenerationResult};

/// Capabilities supported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCapability {
    /// Image generation
    ImageGeneration,
    /// Video generation
    VideoGeneration,
    /// Widget synthesis
    WidgetGeneration,
    /// LoRA fine-tuning
    LoraTraining,
}

impl std::fmt::Display for ProviderCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderCapability::ImageGeneration => write!(f, "Image Generation"),
            ProviderCapability::VideoGeneration => write!(f, "Video Generation"),
            ProviderCapability::WidgetGeneration => write!(f, "Widget Generation"),
            ProviderCapability::LoraTraining => write!(f, "LoRA Training"),
        }
    }
}

/// Configuration for a generative provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeProviderConfig {
    /// API key (if required)
    pub api_key: Option<String>,
    /// Base URL override
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_sec: u64,
    /// Maximum retries on failure
    pub max_retries: u32,
    /// Model ID to use (provider-specific)
    pub model_id: Option<String>,
    /// Additional provider-specific settings
    pub settings: HashMap<String, serde_json::Value>,
}

impl Default for GenerativeProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout_sec: 120,
            max_retries: 3,
            model_id: None,
            settings: HashMap::new(),
        }
    }
}

impl GenerativeProviderConfig {
    /// Creates a new config with API key
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Sets the model ID
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Sets a custom setting
    pub fn with_setting<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.settings.insert(key.into(), v);
        }
        self
    }

    /// Gets a setting value
    pub fn get_setting<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.settings
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Trait for generative AI providers
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Returns the provider name
    fn name(&self) -> &str;

    /// Returns supported capabilities
    fn capabilities(&self) -> Vec<ProviderCapability>;

    /// Checks if provider supports a capability
    fn supports(&self, capability: ProviderCapability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Checks if the provider is available (configured correctly)
    fn is_available(&self) -> bool;

    /// Generates an image
    async fn generate_image(
        &self,
        _params: &ImageGenerationParams,
    ) -> CoreResult<ImageGenerationResult> {
        Err(CoreError::NotSupported(format!(
            "{} does not support image generation",
            self.name()
        )))
    }

    /// Generates a video clip
    async fn generate_video(
        &self,
        _params: &VideoGenerationParams,
    ) -> CoreResult<VideoGenerationResult> {
        Err(CoreError::NotSupported(format!(
            "{} does not support video generation",
            self.name()
        )))
    }

    /// Synthesizes a widget definition
    async fn generate_widget(
        &self,
        _params: &WidgetGenerationParams,
    ) -> CoreResult<WidgetGenerationResult> {
        Err(CoreError::NotSupported(format!(
            "{} does not support widget generation",
            self.name()
        )))
    }

    /// Submits a LoRA training run
    async fn train_lora(&self, _params: &LoraTrainingParams) -> CoreResult<LoraTrainingResult> {
        Err(CoreError::NotSupported(format!(
            "{} does not support LoRA training",
            self.name()
        )))
    }

    /// Gets available models for a capability
    async fn list_models(&self, _capability: ProviderCapability) -> CoreResult<Vec<ModelInfo>> {
        Ok(vec![])
    }
}

/// Information about an available model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Capability this model supports
    pub capability: ProviderCapability,
    /// Cost tier (for UI display)
    pub cost_tier: CostTier,
    /// Whether this is the default model
    pub is_default: bool,
}

/// Cost tier for models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    Free,
    Low,
    Medium,
    High,
    Premium,
}

impl ModelInfo {
    /// Creates a new model info
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        capability: ProviderCapability,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            capability,
            cost_tier: CostTier::Medium,
            is_default: false,
        }
    }

    /// Sets the description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Sets the cost tier
    pub fn with_cost_tier(mut self, tier: CostTier) -> Self {
        self.cost_tier = tier;
        self
    }

    /// Marks as default
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

// ============================================================================
// Mock Provider for Testing
// ============================================================================

/// Mock provider for testing. Supports all capabilities by default and
/// can be forced to fail to exercise the failure paths.
#[derive(Debug)]
pub struct MockGenerativeProvider {
    name: String,
    capabilities: Vec<ProviderCapability>,
    available: bool,
    fail_with: Option<String>,
}

impl MockGenerativeProvider {
    /// Creates a new mock provider
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: vec![
                ProviderCapability::ImageGeneration,
                ProviderCapability::VideoGeneration,
                ProviderCapability::WidgetGeneration,
                ProviderCapability::LoraTraining,
            ],
            available: true,
            fail_with: None,
        }
    }

    /// Sets availability
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Sets capabilities
    pub fn with_capabilities(mut self, caps: Vec<ProviderCapability>) -> Self {
        self.capabilities = caps;
        self
    }

    /// Makes every generation call fail with the given message
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    fn check(&self, capability: ProviderCapability) -> CoreResult<()> {
        if let Some(message) = &self.fail_with {
            return Err(CoreError::GenerationFailed(message.clone()));
        }
        if !self.supports(capability) {
            return Err(CoreError::NotSupported(format!(
                "{capability} not supported"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl GenerativeProvider for MockGenerativeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Vec<ProviderCapability> {
        self.capabilities.clone()
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn generate_image(
        &self,
        params: &ImageGenerationParams,
    ) -> CoreResult<ImageGenerationResult> {
        self.check(ProviderCapability::ImageGeneration)?;

        let id = ulid::Ulid::new().to_string();
        Ok(ImageGenerationResult {
            image_url: format!("mock://images/{id}.png"),
            id,
            prompt: params.prompt.clone(),
            mime_type: "image/png".to_string(),
            width: params.width.unwrap_or(1024),
            height: params.height.unwrap_or(1024),
            model_used: params
                .model_id
                .clone()
                .unwrap_or_else(|| "mock-diffusion".to_string()),
            generation_time_ms: 100,
            metadata: HashMap::new(),
        })
    }

    async fn generate_video(
        &self,
        params: &VideoGenerationParams,
    ) -> CoreResult<VideoGenerationResult> {
        self.check(ProviderCapability::VideoGeneration)?;

        let id = ulid::Ulid::new().to_string();
        Ok(VideoGenerationResult {
            video_url: format!("mock://videos/{id}.mp4"),
            id,
            duration_sec: params.duration_sec,
            model_used: params
                .model_id
                .clone()
                .unwrap_or_else(|| "mock-motion".to_string()),
            generation_time_ms: 250,
        })
    }

    async fn generate_widget(
        &self,
        params: &WidgetGenerationParams,
    ) -> CoreResult<WidgetGenerationResult> {
        self.check(ProviderCapability::WidgetGeneration)?;

        let id = ulid::Ulid::new().to_string();
        Ok(WidgetGenerationResult {
            id,
            definition: serde_json::json!({
                "kind": "widget",
                "prompt": params.prompt,
            }),
            matched_capabilities: params.capabilities.clone(),
            model_used: "mock-widget".to_string(),
            generation_time_ms: 80,
        })
    }

    async fn train_lora(&self, params: &LoraTrainingParams) -> CoreResult<LoraTrainingResult> {
        self.check(ProviderCapability::LoraTraining)?;

        let id = ulid::Ulid::new().to_string();
        Ok(LoraTrainingResult {
            training_handle: format!("mock-training/{id}"),
            id,
            model_name: params.model_name.clone(),
            base_model: params
                .base_model
                .clone()
                .unwrap_or_else(|| "mock-base".to_string()),
            steps: params.steps.unwrap_or(1000),
        })
    }

    async fn list_models(&self, capability: ProviderCapability) -> CoreResult<Vec<ModelInfo>> {
        let models = match capability {
            ProviderCapability::ImageGeneration => vec![
                ModelInfo::new("mock-diffusion", "Mock Diffusion", capability)
                    .with_cost_tier(CostTier::Low)
                    .as_default(),
                ModelInfo::new("mock-diffusion-xl", "Mock Diffusion XL", capability)
                    .with_cost_tier(CostTier::High),
            ],
            ProviderCapability::VideoGeneration => {
                vec![ModelInfo::new("mock-motion", "Mock Motion", capability)
                    .with_cost_tier(CostTier::Premium)
                    .as_default()]
            }
            ProviderCapability::WidgetGeneration => {
                vec![ModelInfo::new("mock-widget", "Mock Widget Author", capability)
                    .with_cost_tier(CostTier::Low)
                    .as_default()]
            }
            ProviderCapability::LoraTraining => {
                vec![ModelInfo::new("mock-trainer", "Mock Trainer", capability)
                    .with_cost_tier(CostTier::Medium)
                    .as_default()]
            }
        };

        Ok(models)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_display() {
        assert_eq!(
            ProviderCapability::ImageGeneration.to_string(),
            "Image Generation"
        );
        assert_eq!(ProviderCapability::LoraTraining.to_string(), "LoRA Training");
    }

    #[test]
    fn test_capability_serialization() {
        assert_eq!(
            serde_json::to_string(&ProviderCapability::VideoGeneration).unwrap(),
            "\"video_generation\""
        );
        assert_eq!(
            serde_json::from_str::<ProviderCapability>("\"lora_training\"").unwrap(),
            ProviderCapability::LoraTraining
        );
    }

    #[test]
    fn test_config_builder() {
        let config = GenerativeProviderConfig::with_api_key("test")
            .with_model("dream-v3")
            .with_setting("quality", "hd");

        assert_eq!(config.model_id, Some("dream-v3".to_string()));
        assert_eq!(
            config.get_setting::<String>("quality"),
            Some("hd".to_string())
        );
        assert_eq!(config.timeout_sec, 120);
    }

    #[test]
    fn test_mock_provider_new() {
        let provider = MockGenerativeProvider::new("mock");

        assert_eq!(provider.name(), "mock");
        assert!(provider.is_available());
        assert!(provider.supports(ProviderCapability::WidgetGeneration));
    }

    #[tokio::test]
    async fn test_mock_provider_generate_image() {
        let provider = MockGenerativeProvider::new("mock");
        let params = ImageGenerationParams::new("a sunset over mountains");

        let result = provider.generate_image(&params).await.unwrap();

        assert!(!result.id.is_empty());
        assert!(result.image_url.starts_with("mock://images/"));
        assert_eq!(result.prompt, "a sunset over mountains");
    }

    #[tokio::test]
    async fn test_mock_provider_train_lora() {
        let provider = MockGenerativeProvider::new("mock");
        let params = LoraTrainingParams::new("ink-style", vec!["https://x/1.png".to_string()])
            .with_steps(2000);

        let result = provider.train_lora(&params).await.unwrap();

        assert!(result.training_handle.starts_with("mock-training/"));
        assert_eq!(result.steps, 2000);
    }

    #[tokio::test]
    async fn test_mock_provider_unsupported_capability() {
        let provider = MockGenerativeProvider::new("mock")
            .with_capabilities(vec![ProviderCapability::ImageGeneration]);

        let params = VideoGenerationParams::new("nope");
        let result = provider.generate_video(&params).await;

        assert!(matches!(result, Err(CoreError::NotSupported(_))));
    }

    #[tokio::test]
    async fn test_mock_provider_forced_failure() {
        let provider = MockGenerativeProvider::new("mock").failing_with("gpu on fire");

        let params = ImageGenerationParams::new("anything");
        let err = provider.generate_image(&params).await.unwrap_err();

        assert!(matches!(err, CoreError::GenerationFailed(_)));
        assert!(err.to_string().contains("gpu on fire"));
    }

    #[tokio::test]
    async fn test_mock_provider_list_models() {
        let provider = MockGenerativeProvider::new("mock");

        let models = provider
            .list_models(ProviderCapability::ImageGeneration)
            .await
            .unwrap();
        assert!(!models.is_empty());
        assert!(models.iter().any(|m| m.is_default));
    }
}
