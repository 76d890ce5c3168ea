pub mod classifier;
pub mod config;
pub mod models;
pub mod server;

pub use classifier::{ClassifierConfig, ClassifierError, ImageClassifier, InputTensor, Model};
pub use config::ServerConfig;
pub use models::{ClassScore, InputShape, Label, LabelSet, ModelMetadata, Normalization, Prediction};
pub use server::{AppState, router};
