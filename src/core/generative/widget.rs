//! Widget Generation
//!
//! Parameters and results for AI widget synthesis. A widget is a small
//! interactive canvas element described by a JSON definition; matching the
//! requested capability tags to the canvas runtime happens outside this
//! core.

use serde::{Deserialize, Serialize};

/// Parameters for a widget generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetGenerationParams {
    /// Natural-language description of the widget
    pub prompt: String,
    /// Capability tags requested for the widget
    pub capabilities: Vec<String>,
}

impl WidgetGenerationParams {
    /// Creates params with just a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            capabilities: Vec::new(),
        }
    }

    /// Adds a requested capability tag
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
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

/// Result of a widget generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetGenerationResult {
    /// Result ID
    pub id: String,
    /// JSON widget definition consumed by the canvas runtime
    pub definition: serde_json::Value,
    /// Capability tags the provider actually honored
    pub matched_capabilities: Vec<String>,
    /// Model that produced the widget
    pub model_used: String,
    /// Wall-clock generation time
    pub generation_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_builder() {
        let params = WidgetGenerationParams::new("a pomodoro timer")
            .with_capability("timer")
            .with_capability("notifications");

        assert_eq!(params.capabilities.len(), 2);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_prompt() {
        assert!(WidgetGenerationParams::new("").validate().is_err());
    }
}
