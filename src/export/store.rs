//! Process-wide holder of the current model plus its on-disk artifacts

use super::serializer::{load_model, save_model, SerializationFormat};
use crate::error::Result;
use crate::training::{Algorithm, TrainedModel};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Current model behind an atomic pointer swap, and the directory its
/// artifacts live in.
///
/// The lock only guards the `Option<Arc<_>>`; readers clone the `Arc` and
/// score without holding it, so they always see one complete model.
#[derive(Debug)]
pub struct ModelStore {
    model_dir: PathBuf,
    format: SerializationFormat,
    current: RwLock<Option<Arc<TrainedModel>>>,
}

impl ModelStore {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            format: SerializationFormat::default(),
            current: RwLock::new(None),
        }
    }

    pub fn with_format(mut self, format: SerializationFormat) -> Self {
        self.format = format;
        self
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn format(&self) -> SerializationFormat {
        self.format
    }

    /// `<model_dir>/<algorithm>_model.<ext>`
    pub fn path_for(&self, algorithm: Algorithm) -> PathBuf {
        self.model_dir
            .join(format!("{}_model.{}", algorithm, self.format.extension()))
    }

    /// Persist `model` under its algorithm's path. Does not change the
    /// current model.
    pub fn save(&self, model: &TrainedModel) -> Result<PathBuf> {
        fs::create_dir_all(&self.model_dir)?;
        let path = self.path_for(model.algorithm());
        save_model(model, &path, self.format)?;
        info!(
            path = %path.display(),
            model_id = %model.metadata().model_id,
            "Model saved"
        );
        Ok(path)
    }

    /// Read an artifact and install it as the current model
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<TrainedModel>> {
        let path = path.as_ref();
        let model = Arc::new(load_model(path)?);
        *self.current.write() = Some(Arc::clone(&model));
        info!(
            path = %path.display(),
            algorithm = %model.algorithm(),
            model_id = %model.metadata().model_id,
            "Model loaded"
        );
        Ok(model)
    }

    /// Load the saved artifact for `algorithm` if one exists
    pub fn load_existing(&self, algorithm: Algorithm) -> Result<Option<Arc<TrainedModel>>> {
        let path = self.path_for(algorithm);
        if !path.exists() {
            debug!(path = %path.display(), "No saved model");
            return Ok(None);
        }
        self.load(&path).map(Some)
    }

    pub fn current(&self) -> Option<Arc<TrainedModel>> {
        self.current.read().clone()
    }

    /// Swap in a new current model, returning it
    pub fn replace(&self, model: TrainedModel) -> Arc<TrainedModel> {
        let model = Arc::new(model);
        *self.current.write() = Some(Arc::clone(&model));
        model
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }
}
