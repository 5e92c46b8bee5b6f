//! LoRA Training
//!
//! Parameters and results for fine-tuning a LoRA adapter on user images.
//! Training runs remotely; the result carries a handle the application
//! polls through the provider, not the finished weights.

use serde::{Deserialize, Serialize};

use crate::core::ModelId;

/// Parameters for a LoRA training request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoraTrainingParams {
    /// Display name for the trained model
    pub model_name: String,
    /// URLs of the training images
    pub training_image_urls: Vec<String>,
    /// Base model to fine-tune
    pub base_model: Option<ModelId>,
    /// Training steps override
    pub steps: Option<u32>,
}

impl LoraTrainingParams {
    /// Creates params for a named model over a training set
    pub fn new(model_name: impl Into<String>, training_image_urls: Vec<String>) -> Self {
        Self {
            model_name: model_name.into(),
            training_image_urls,
            base_model: None,
            steps: None,
        }
    }

    /// Sets the base model
    pub fn with_base_model(mut self, base_model: impl Into<ModelId>) -> Self {
        self.base_model = Some(base_model.into());
        self
    }

    /// Sets the step count
    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = Some(steps);
        self
    }

    /// Validates the params
    pub fn validate(&self) -> Result<(), String> {
        if self.model_name.trim().is_empty() {
            return Err("modelName is empty".to_string());
        }
        if self.training_image_urls.is_empty() {
            return Err("trainingImageUrls is empty".to_string());
        }
        Ok(())
    }
}

/// Result of submitting a LoRA training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoraTrainingResult {
    /// Result ID
    pub id: String,
    /// Provider-side handle for polling the training run
    pub training_handle: String,
    /// Name the trained model was registered under
    pub model_name: String,
    /// Base model that was fine-tuned
    pub base_model: ModelId,
    /// Steps the run was submitted with
    pub steps: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_builder() {
        let params = LoraTrainingParams::new(
            "watercolor-style",
            vec!["https://cdn/img1.png".to_string()],
        )
        .with_base_model("sd-xl")
        .with_steps(1500);

        assert_eq!(params.base_model, Some("sd-xl".to_string()));
        assert_eq!(params.steps, Some(1500));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_requires_training_images() {
        let params = LoraTrainingParams::new("style", vec![]);
        assert!(params.validate().is_err());
    }
}
