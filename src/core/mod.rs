//! Atelier Core Engine
//!
//! Headless core of the Atelier canvas application: the asynchronous
//! job-processing framework plus the narrow seams to its collaborators
//! (queue transport, generation providers, asset persistence).

pub mod assets;
pub mod generative;
pub mod jobs;
pub mod queue;
pub mod settings;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
