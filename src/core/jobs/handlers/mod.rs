//! Concrete Job Handlers
//!
//! One handler per job kind, each thin glue between a queue payload and
//! the generation/persistence collaborators. Handlers follow the same
//! contract: validate, generate (failures propagate), report progress at
//! milestones, and absorb asset-record failures into a degraded success.

mod image;
mod lora;
mod video;
mod widget;

pub use image::*;
pub use lora::*;
pub use video::*;
pub use widget::*;
