//! Image Generation
//!
//! Parameters and results for AI image generation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::ModelId;

/// Parameters for an image generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationParams {
    /// Text prompt
    pub prompt: String,
    /// Things to avoid
    pub negative_prompt: Option<String>,
    /// Output width in pixels
    pub width: Option<u32>,
    /// Output height in pixels
    pub height: Option<u32>,
    /// Model override (provider default otherwise)
    pub model_id: Option<ModelId>,
}

impl ImageGenerationParams {
    /// Creates params with just a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: None,
            width: None,
            height: None,
            model_id: None,
        }
    }

    /// Sets the output dimensions
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets the negative prompt
    pub fn with_negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative.into());
        self
    }

    /// Sets a model override
    pub fn with_model(mut self, model_id: impl Into<ModelId>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Validates the params
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("prompt is empty".to_string());
        }
        Ok(())
    }
}

/// Result of an image generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationResult {
    /// Result ID
    pub id: String,
    /// Prompt that produced the image
    pub prompt: String,
    /// Where the generated image lives
    pub image_url: String,
    /// MIME type of the image
    pub mime_type: String,
    /// Actual output width
    pub width: u32,
    /// Actual output height
    pub height: u32,
    /// Model that produced the image
    pub model_used: String,
    /// Wall-clock generation time
    pub generation_time_ms: u64,
    /// Provider-specific extras
    pub metadata: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_builder() {
        let params = ImageGenerationParams::new("a lighthouse at dawn")
            .with_size(512, 768)
            .with_negative_prompt("blurry")
            .with_model("sd-xl");

        assert_eq!(params.width, Some(512));
        assert_eq!(params.height, Some(768));
        assert_eq!(params.negative_prompt, Some("blurry".to_string()));
        assert_eq!(params.model_id, Some("sd-xl".to_string()));
    }

    #[test]
    fn test_params_validation() {
        assert!(ImageGenerationParams::new("ok").validate().is_ok());
        assert!(ImageGenerationParams::new("   ").validate().is_err());
    }
}
