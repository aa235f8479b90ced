//! Model discovery and assignment.

pub mod registry;

pub use registry::{default_free_models, ModelRegistry};
