//! Model artifact format
//!
//! A saved model is one [`ModelArtifact`]: magic bytes, a format version,
//! the training metadata in clear, and the encoded [`TrainedModel`] payload
//! guarded by an FNV-1a checksum.

use crate::error::{Result, RiskError};
use crate::training::{TrainedModel, TrainingMetadata};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationFormat {
    /// Binary format using bincode (efficient)
    #[default]
    Binary,
    /// JSON format (portable, human-readable)
    Json,
}

impl SerializationFormat {
    /// File extension for artifacts in this format
    pub fn extension(&self) -> &'static str {
        match self {
            SerializationFormat::Binary => "bin",
            SerializationFormat::Json => "json",
        }
    }

    /// Format implied by a path's extension; anything but `.json` is binary
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SerializationFormat::Json,
            _ => SerializationFormat::Binary,
        }
    }
}

impl FromStr for SerializationFormat {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" | "bin" | "bincode" => Ok(SerializationFormat::Binary),
            "json" => Ok(SerializationFormat::Json),
            other => Err(RiskError::InvalidParameter {
                name: "format".to_string(),
                value: other.to_string(),
                reason: "expected binary or json".to_string(),
            }),
        }
    }
}

/// Serialized model wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Magic bytes for format detection
    pub magic: [u8; 4],
    /// Format version
    pub format_version: u32,
    /// Payload encoding
    pub format: SerializationFormat,
    /// Training metadata, readable without decoding the payload
    pub metadata: TrainingMetadata,
    /// Encoded model
    pub model_data: Vec<u8>,
    /// Checksum for integrity verification
    pub checksum: u64,
}

impl ModelArtifact {
    /// Magic bytes for dropout-risk model files
    pub const MAGIC: [u8; 4] = [b'D', b'R', b'S', b'K'];
    /// Current format version
    pub const VERSION: u32 = 1;

    /// Encode `model` into a new artifact
    pub fn from_model(model: &TrainedModel, format: SerializationFormat) -> Result<Self> {
        let model_data = match format {
            SerializationFormat::Binary => bincode::serialize(model)?,
            SerializationFormat::Json => serde_json::to_vec(model)?,
        };
        let checksum = Self::compute_checksum(&model_data);
        Ok(Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            format,
            metadata: model.metadata().clone(),
            model_data,
            checksum,
        })
    }

    /// Compute checksum using FNV-1a hash
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        let mut hash = FNV_OFFSET;
        for byte in data {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }

    /// Verify checksum
    pub fn verify_checksum(&self) -> bool {
        Self::compute_checksum(&self.model_data) == self.checksum
    }

    /// Check header and checksum, then decode the model
    pub fn into_model(self) -> Result<TrainedModel> {
        if self.magic != Self::MAGIC {
            return Err(RiskError::SerializationError(
                "not a dropout-risk model artifact (bad magic bytes)".to_string(),
            ));
        }
        if self.format_version != Self::VERSION {
            return Err(RiskError::SerializationError(format!(
                "unsupported artifact version {} (expected {})",
                self.format_version,
                Self::VERSION
            )));
        }
        if !self.verify_checksum() {
            return Err(RiskError::SerializationError(
                "Checksum verification failed - file may be corrupted".to_string(),
            ));
        }

        let model: TrainedModel = match self.format {
            SerializationFormat::Binary => bincode::deserialize(&self.model_data)?,
            SerializationFormat::Json => serde_json::from_slice(&self.model_data)?,
        };
        Ok(model)
    }
}

/// Write `model` to `path`
pub fn save_model(model: &TrainedModel, path: impl AsRef<Path>, format: SerializationFormat) -> Result<()> {
    let artifact = ModelArtifact::from_model(model, format)?;
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    match format {
        SerializationFormat::Binary => {
            let bytes = bincode::serialize(&artifact)?;
            writer.write_all(&bytes)?;
        }
        SerializationFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &artifact)?;
        }
    }
    writer.flush()?;

    Ok(())
}

/// Read a model from `path`; the format follows the file extension
pub fn load_model(path: impl AsRef<Path>) -> Result<TrainedModel> {
    read_artifact(path)?.into_model()
}

/// Read the artifact envelope without decoding the model
pub fn read_artifact(path: impl AsRef<Path>) -> Result<ModelArtifact> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);

    let artifact: ModelArtifact = match SerializationFormat::from_path(path) {
        SerializationFormat::Binary => {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            bincode::deserialize(&bytes)?
        }
        SerializationFormat::Json => serde_json::from_reader(&mut reader)?,
    };
    Ok(artifact)
}
