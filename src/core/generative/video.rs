//! Video Generation
//!
//! Parameters and results for AI video generation. Supports text-to-video
//! and image-to-video modes.

use serde::{Deserialize, Serialize};

use crate::core::ModelId;

// =============================================================================
// Enums
// =============================================================================

/// Video generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoGenMode {
    /// Generate video from text prompt
    #[default]
    TextToVideo,
    /// Generate video from a reference image + prompt
    ImageToVideo,
}

impl std::fmt::Display for VideoGenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoGenMode::TextToVideo => write!(f, "Text to Video"),
            VideoGenMode::ImageToVideo => write!(f, "Image to Video"),
        }
    }
}

// =============================================================================
// Generation Parameters
// =============================================================================

/// Parameters for a video generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGenerationParams {
    /// Text prompt
    pub prompt: String,
    /// Generation mode
    pub mode: VideoGenMode,
    /// Clip length in seconds
    pub duration_sec: f32,
    /// Reference image for image-to-video
    pub reference_image_url: Option<String>,
    /// Model override (provider default otherwise)
    pub model_id: Option<ModelId>,
}

impl VideoGenerationParams {
    /// Default clip length in seconds
    pub const DEFAULT_DURATION_SEC: f32 = 5.0;

    /// Creates text-to-video params
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            mode: VideoGenMode::TextToVideo,
            duration_sec: Self::DEFAULT_DURATION_SEC,
            reference_image_url: None,
            model_id: None,
        }
    }

    /// Creates image-to-video params
    pub fn from_image(prompt: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            mode: VideoGenMode::ImageToVideo,
            duration_sec: Self::DEFAULT_DURATION_SEC,
            reference_image_url: Some(image_url.into()),
            model_id: None,
        }
    }

    /// Sets the clip length
    pub fn with_duration(mut self, duration_sec: f32) -> Self {
        self.duration_sec = duration_sec;
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
        if !self.duration_sec.is_finite() || self.duration_sec <= 0.0 {
            return Err("durationSec must be a positive number".to_string());
        }
        if self.mode == VideoGenMode::ImageToVideo && self.reference_image_url.is_none() {
            return Err("image-to-video requires referenceImageUrl".to_string());
        }
        Ok(())
    }
}

/// Result of a video generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGenerationResult {
    /// Result ID
    pub id: String,
    /// Where the generated clip lives
    pub video_url: String,
    /// Actual clip length in seconds
    pub duration_sec: f32,
    /// Model that produced the clip
    pub model_used: String,
    /// Wall-clock generation time
    pub generation_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_to_video_params() {
        let params = VideoGenerationParams::new("a storm over the sea").with_duration(12.0);
        assert_eq!(params.mode, VideoGenMode::TextToVideo);
        assert_eq!(params.duration_sec, 12.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_image_to_video_requires_reference() {
        let mut params = VideoGenerationParams::from_image("animate this", "https://x/y.png");
        assert!(params.validate().is_ok());

        params.reference_image_url = None;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_duration() {
        let params = VideoGenerationParams::new("ok").with_duration(0.0);
        assert!(params.validate().is_err());

        let params = VideoGenerationParams::new("ok").with_duration(f32::INFINITY);
        assert!(params.validate().is_err());
    }
}
