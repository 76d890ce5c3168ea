use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{ClassifierError, ImageClassifier, Model, RtenModel};
use crate::models::{InputShape, LabelSet, ModelMetadata, Normalization};

pub const MODEL_FILE_NAME: &str = "model.rten";
pub const METADATA_FILE_NAME: &str = "metadata.json";
pub const DEFAULT_IMAGE_SIZE: u32 = 224;

/// Where to find the model artifacts and how to feed the network
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    /// Defaults to `metadata.json` next to the model file
    pub metadata_path: Option<PathBuf>,
    /// Square input size used when neither the model nor the metadata declares one
    pub default_image_size: u32,
    /// Used when the metadata does not name a normalization
    pub normalization: Normalization,
}

impl ClassifierConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            metadata_path: None,
            default_image_size: DEFAULT_IMAGE_SIZE,
            normalization: Normalization::default(),
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        match &self.metadata_path {
            Some(path) => path.clone(),
            None => self
                .model_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(METADATA_FILE_NAME),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::new(Path::new("model").join(MODEL_FILE_NAME))
    }
}

impl ModelMetadata {
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        serde_json::from_str(json).map_err(|e| ClassifierError::Metadata(e.to_string()))
    }

    /// Read a metadata file. `Ok(None)` when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, ClassifierError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(json) => Self::from_json(&json).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClassifierError::Metadata(e.to_string())),
        }
    }
}

/// Metadata if present and well formed; anything else falls back to defaults
pub fn read_metadata(path: &Path) -> Option<ModelMetadata> {
    match ModelMetadata::load(path) {
        Ok(Some(metadata)) => {
            info!("Loaded model metadata from {}", path.display());
            Some(metadata)
        }
        Ok(None) => {
            info!("No metadata at {}, using default labels", path.display());
            None
        }
        Err(e) => {
            warn!("Ignoring metadata at {}: {}", path.display(), e);
            None
        }
    }
}

/// Model-declared shape wins, then the metadata `imageSize`, then the default
pub fn resolve_input_shape(
    declared: Option<InputShape>,
    metadata: Option<&ModelMetadata>,
    default_size: u32,
) -> InputShape {
    if let Some(shape) = declared {
        return shape;
    }
    let size = metadata
        .and_then(|m| m.image_size)
        .filter(|&size| size > 0)
        .unwrap_or(default_size);
    InputShape::square(size)
}

/// Load the weights from disk and assemble the classifier
pub fn load_classifier(config: &ClassifierConfig) -> Result<ImageClassifier, ClassifierError> {
    let model = RtenModel::load(&config.model_path)?;
    Ok(build_classifier(Box::new(model), config))
}

/// Assemble a classifier around an already loaded model
pub fn build_classifier(model: Box<dyn Model>, config: &ClassifierConfig) -> ImageClassifier {
    let metadata = read_metadata(&config.metadata_path());
    let labels = LabelSet::from_metadata(metadata.as_ref());
    let input_shape = resolve_input_shape(
        model.input_shape(),
        metadata.as_ref(),
        config.default_image_size,
    );
    let normalization = metadata
        .as_ref()
        .and_then(|m| m.normalization)
        .unwrap_or(config.normalization);

    info!(
        "Model {} ready: classes {:?}, input {}x{}x{} ({:?}), normalization {:?}",
        model.name(),
        labels.ids(),
        input_shape.height,
        input_shape.width,
        input_shape.channels,
        input_shape.layout,
        normalization
    );

    ImageClassifier::new(model, labels, input_shape, normalization)
}
