//! Typed Job Payloads
//!
//! Producers enqueue from the web tier, which is a trust boundary: every
//! payload is validated before a worker touches it. Each job kind has its
//! own payload type (serde `deny_unknown_fields`), so a handler can only
//! ever receive the shape it was written for.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::{CanvasId, ModelId, QueueName};

fn validate_string_len(label: &str, value: &str, max: usize) -> Result<(), String> {
    if value.len() > max {
        return Err(format!("{label} is too long (max {max} chars)"));
    }
    Ok(())
}

fn validate_required(label: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{label} is empty"));
    }
    Ok(())
}

fn validate_id(label: &str, id: &str) -> Result<(), String> {
    validate_required(label, id)?;
    validate_string_len(label, id, 256)?;
    Ok(())
}

fn validate_prompt(label: &str, prompt: &str) -> Result<(), String> {
    validate_required(label, prompt)?;
    validate_string_len(label, prompt, 20_000)?;
    Ok(())
}

// =============================================================================
// Payload Trait
// =============================================================================

/// Contract every queue payload satisfies: serializable, validated, and
/// aware of the queue its kind conventionally lives on.
pub trait JobPayload:
    Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Short kind tag for logs (`image`, `video`, `widget`, `lora`)
    fn kind() -> &'static str;

    /// Conventional queue name for this kind
    fn default_queue() -> QueueName;

    /// Semantic validation (lengths, ranges, required fields)
    fn validate(&self) -> Result<(), String>;
}

// =============================================================================
// Image Generation
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageGenerationPayload {
    /// Canvas the generated image lands on
    pub canvas_id: CanvasId,
    /// Text prompt
    pub prompt: String,
    /// Optional negative prompt
    pub negative_prompt: Option<String>,
    /// Output width in pixels
    pub width: Option<u32>,
    /// Output height in pixels
    pub height: Option<u32>,
    /// Provider-specific model override
    pub model_id: Option<ModelId>,
}

impl JobPayload for ImageGenerationPayload {
    fn kind() -> &'static str {
        "image"
    }

    fn default_queue() -> QueueName {
        "ai:image".to_string()
    }

    fn validate(&self) -> Result<(), String> {
        validate_id("canvasId", &self.canvas_id)?;
        validate_prompt("prompt", &self.prompt)?;
        if let Some(neg) = &self.negative_prompt {
            validate_string_len("negativePrompt", neg, 20_000)?;
        }
        for (label, dim) in [("width", self.width), ("height", self.height)] {
            if let Some(v) = dim {
                if !(64..=8192).contains(&v) {
                    return Err(format!("{label} must be between 64 and 8192"));
                }
            }
        }
        if let Some(model) = &self.model_id {
            validate_id("modelId", model)?;
        }
        Ok(())
    }
}

// =============================================================================
// Video Generation
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VideoGenerationPayload {
    /// Canvas the generated clip lands on
    pub canvas_id: CanvasId,
    /// Text prompt
    pub prompt: String,
    /// Clip length in seconds
    pub duration_sec: Option<f32>,
    /// Optional reference image for image-to-video
    pub reference_image_url: Option<String>,
    /// Provider-specific model override
    pub model_id: Option<ModelId>,
}

impl JobPayload for VideoGenerationPayload {
    fn kind() -> &'static str {
        "video"
    }

    fn default_queue() -> QueueName {
        "ai:video".to_string()
    }

    fn validate(&self) -> Result<(), String> {
        validate_id("canvasId", &self.canvas_id)?;
        validate_prompt("prompt", &self.prompt)?;
        if let Some(duration) = self.duration_sec {
            if !duration.is_finite() || duration <= 0.0 {
                return Err("durationSec must be a positive number".to_string());
            }
            if duration > 600.0 {
                return Err("durationSec must be at most 600".to_string());
            }
        }
        if let Some(url) = &self.reference_image_url {
            validate_required("referenceImageUrl", url)?;
            validate_string_len("referenceImageUrl", url, 4096)?;
        }
        if let Some(model) = &self.model_id {
            validate_id("modelId", model)?;
        }
        Ok(())
    }
}

// =============================================================================
// Widget Generation
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WidgetGenerationPayload {
    /// Canvas the widget attaches to
    pub canvas_id: CanvasId,
    /// Natural-language description of the widget
    pub prompt: String,
    /// Capability tags requested for the widget (matched externally)
    pub capabilities: Option<Vec<String>>,
}

impl JobPayload for WidgetGenerationPayload {
    fn kind() -> &'static str {
        "widget"
    }

    fn default_queue() -> QueueName {
        "ai:widget".to_string()
    }

    fn validate(&self) -> Result<(), String> {
        validate_id("canvasId", &self.canvas_id)?;
        validate_prompt("prompt", &self.prompt)?;
        if let Some(caps) = &self.capabilities {
            if caps.len() > 64 {
                return Err("capabilities too large".to_string());
            }
            for cap in caps {
                validate_required("capabilities[]", cap)?;
                validate_string_len("capabilities[]", cap, 128)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// LoRA Training
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoraTrainingPayload {
    /// Display name for the trained model
    pub model_name: String,
    /// URLs of the training images
    pub training_image_urls: Vec<String>,
    /// Base model to fine-tune
    pub base_model: Option<ModelId>,
    /// Training steps override
    pub steps: Option<u32>,
}

impl JobPayload for LoraTrainingPayload {
    fn kind() -> &'static str {
        "lora"
    }

    fn default_queue() -> QueueName {
        "ai:lora".to_string()
    }

    fn validate(&self) -> Result<(), String> {
        validate_required("modelName", &self.model_name)?;
        validate_string_len("modelName", &self.model_name, 256)?;
        if self.training_image_urls.is_empty() {
            return Err("trainingImageUrls is empty".to_string());
        }
        if self.training_image_urls.len() > 500 {
            return Err("trainingImageUrls too large".to_string());
        }
        for url in &self.training_image_urls {
            validate_required("trainingImageUrls[]", url)?;
            validate_string_len("trainingImageUrls[]", url, 4096)?;
        }
        if let Some(base) = &self.base_model {
            validate_id("baseModel", base)?;
        }
        if let Some(steps) = self.steps {
            if !(100..=20_000).contains(&steps) {
                return Err("steps must be between 100 and 20000".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_payload() -> ImageGenerationPayload {
        ImageGenerationPayload {
            canvas_id: "canvas_001".to_string(),
            prompt: "a fox in a paper boat".to_string(),
            negative_prompt: None,
            width: Some(1024),
            height: Some(1024),
            model_id: None,
        }
    }

    #[test]
    fn test_image_payload_valid() {
        assert!(image_payload().validate().is_ok());
    }

    #[test]
    fn test_image_payload_rejects_empty_prompt() {
        let mut payload = image_payload();
        payload.prompt = "   ".to_string();
        let err = payload.validate().unwrap_err();
        assert!(err.contains("prompt"));
    }

    #[test]
    fn test_image_payload_rejects_absurd_dimensions() {
        let mut payload = image_payload();
        payload.width = Some(32);
        assert!(payload.validate().is_err());

        payload.width = Some(100_000);
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let raw = serde_json::json!({
            "canvasId": "canvas_001",
            "prompt": "hello",
            "__proto__": {"pollute": true}
        });
        let parsed: Result<ImageGenerationPayload, _> = serde_json::from_value(raw);
        let err = parsed.unwrap_err().to_string();
        assert!(err.to_ascii_lowercase().contains("unknown field"));
    }

    #[test]
    fn test_video_payload_duration_bounds() {
        let mut payload = VideoGenerationPayload {
            canvas_id: "canvas_001".to_string(),
            prompt: "waves at dusk".to_string(),
            duration_sec: Some(12.0),
            reference_image_url: None,
            model_id: None,
        };
        assert!(payload.validate().is_ok());

        payload.duration_sec = Some(-1.0);
        assert!(payload.validate().is_err());

        payload.duration_sec = Some(f32::NAN);
        assert!(payload.validate().is_err());

        payload.duration_sec = Some(4000.0);
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_widget_payload_capability_limits() {
        let payload = WidgetGenerationPayload {
            canvas_id: "canvas_001".to_string(),
            prompt: "a countdown timer".to_string(),
            capabilities: Some(vec!["timer".to_string(), "clock".to_string()]),
        };
        assert!(payload.validate().is_ok());

        let payload = WidgetGenerationPayload {
            canvas_id: "canvas_001".to_string(),
            prompt: "too many".to_string(),
            capabilities: Some(vec!["x".to_string(); 65]),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_lora_payload_requires_training_images() {
        let payload = LoraTrainingPayload {
            model_name: "my-style".to_string(),
            training_image_urls: vec![],
            base_model: None,
            steps: None,
        };
        let err = payload.validate().unwrap_err();
        assert!(err.contains("trainingImageUrls"));
    }

    #[test]
    fn test_default_queue_names() {
        assert_eq!(ImageGenerationPayload::default_queue(), "ai:image");
        assert_eq!(VideoGenerationPayload::default_queue(), "ai:video");
        assert_eq!(WidgetGenerationPayload::default_queue(), "ai:widget");
        assert_eq!(LoraTrainingPayload::default_queue(), "ai:lora");
    }
}
