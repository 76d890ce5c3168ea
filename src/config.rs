use std::path::PathBuf;

use clap::Args;

use crate::classifier::ClassifierConfig;
use crate::classifier::loader::DEFAULT_IMAGE_SIZE;
use crate::models::Normalization;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_MAX_JSON_BYTES: usize = 10 * 1024 * 1024;

/// Options shared by every command that loads the model
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Path to the .rten model file
    #[arg(long, env = "MODEL_PATH", default_value = "model/model.rten", value_name = "FILE")]
    pub model: PathBuf,

    /// Metadata file with labels and image size (defaults to metadata.json next to the model)
    #[arg(long, env = "METADATA_PATH", value_name = "FILE")]
    pub metadata: Option<PathBuf>,

    /// Input size used when neither the model nor the metadata declares one
    #[arg(
        long,
        env = "IMAGE_SIZE",
        default_value_t = DEFAULT_IMAGE_SIZE,
        value_parser = clap::value_parser!(u32).range(1..),
        value_name = "PIXELS"
    )]
    pub image_size: u32,

    /// Pixel scaling used when the metadata does not specify one
    #[arg(long, env = "NORMALIZATION", value_enum, default_value_t = Normalization::Unit)]
    pub normalization: Normalization,
}

impl ModelArgs {
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            model_path: self.model.clone(),
            metadata_path: self.metadata.clone(),
            default_image_size: self.image_size,
            normalization: self.normalization,
        }
    }
}

/// Options for the HTTP server
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory uploaded images are written to
    #[arg(long, env = "UPLOADS_DIR", default_value = "uploads", value_name = "DIR")]
    pub uploads_dir: PathBuf,

    /// Directory with the browser front-end
    #[arg(long, env = "PUBLIC_DIR", default_value = "public", value_name = "DIR")]
    pub public_dir: PathBuf,

    /// Largest accepted multipart upload, in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Largest accepted JSON body for /predict, in bytes
    #[arg(long, env = "MAX_JSON_BYTES", default_value_t = DEFAULT_MAX_JSON_BYTES)]
    pub max_json_bytes: usize,
}

impl ServeArgs {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            uploads_dir: self.uploads_dir.clone(),
            public_dir: self.public_dir.clone(),
            max_upload_bytes: self.max_upload_bytes,
            max_json_bytes: self.max_json_bytes,
        }
    }
}

/// Runtime settings of the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub uploads_dir: PathBuf,
    pub public_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub max_json_bytes: usize,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            uploads_dir: PathBuf::from("uploads"),
            public_dir: PathBuf::from("public"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_json_bytes: DEFAULT_MAX_JSON_BYTES,
        }
    }
}
