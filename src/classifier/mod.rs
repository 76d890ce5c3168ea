pub mod loader;
pub mod predictor;
pub mod preprocessing;
mod rten_model;

use std::path::PathBuf;
use std::time::Instant;

use image::DynamicImage;
use thiserror::Error;
use tracing::debug;

use crate::models::{InputShape, LabelSet, Normalization, Prediction};

pub use loader::{ClassifierConfig, build_classifier, load_classifier};
pub use preprocessing::InputTensor;
pub use rten_model::RtenModel;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("failed to load model {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },
    #[error("invalid model metadata: {0}")]
    Metadata(String),
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Inference backend that turns an input tensor into raw class scores
pub trait Model: Send + Sync {
    /// Input shape the network declares, when every non-batch dimension is fixed
    fn input_shape(&self) -> Option<InputShape>;

    /// Run the network on a single batch and return the flattened output
    fn infer(&self, input: InputTensor) -> Result<Vec<f32>, ClassifierError>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

/// Loaded model plus everything needed to go from image bytes to a prediction.
/// Immutable once built; share it behind an `Arc`.
pub struct ImageClassifier {
    model: Box<dyn Model>,
    labels: LabelSet,
    input_shape: InputShape,
    normalization: Normalization,
}

impl std::fmt::Debug for ImageClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageClassifier")
            .field("model", &self.model.name())
            .field("labels", &self.labels)
            .field("input_shape", &self.input_shape)
            .field("normalization", &self.normalization)
            .finish()
    }
}

impl ImageClassifier {
    pub fn new(
        model: Box<dyn Model>,
        labels: LabelSet,
        input_shape: InputShape,
        normalization: Normalization,
    ) -> Self {
        Self {
            model,
            labels,
            input_shape,
            normalization,
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Decode encoded image bytes (png, jpeg, ...) and classify them
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Prediction, ClassifierError> {
        let img = preprocessing::decode_image(bytes)?;
        self.classify_image(&img)
    }

    /// Classify an already decoded image
    pub fn classify_image(&self, img: &DynamicImage) -> Result<Prediction, ClassifierError> {
        let tensor = preprocessing::to_tensor(img, self.input_shape, self.normalization);

        if let Some(declared) = self.model.input_shape() {
            if declared.dims() != tensor.shape() {
                return Err(ClassifierError::Inference(format!(
                    "tensor shape {:?} does not match model input {:?}",
                    tensor.shape(),
                    declared.dims()
                )));
            }
        }

        debug!(
            "Running {} on {}x{} image, tensor {:?}",
            self.model.name(),
            img.width(),
            img.height(),
            tensor.shape()
        );
        let started = Instant::now();
        let raw = self.model.infer(tensor)?;
        debug!("Inference took {:.2?}, raw output {:?}", started.elapsed(), raw);

        predictor::interpret(&raw, &self.labels)
    }
}
