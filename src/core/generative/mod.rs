//! Generative AI Module
//!
//! Provider abstraction for the external generation services the job
//! handlers call: image, video, widget synthesis, and LoRA fine-tuning.

mod image;
mod lora;
mod providers;
#[cfg(feature = "ai-providers")]
mod remote;
mod video;
mod widget;

pub use image::*;
pub use lora::*;
pub use providers::*;
#[cfg(feature = "ai-providers")]
pub use remote::*;
pub use video::*;
pub use widget::*;
