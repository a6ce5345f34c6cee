//! Model persistence module
//!
//! - Versioned, checksummed model artifacts (bincode or JSON payloads)
//! - [`ModelStore`]: the shared current model and its artifact directory

mod serializer;
mod store;

pub use serializer::{load_model, read_artifact, save_model, ModelArtifact, SerializationFormat};
pub use store::ModelStore;
