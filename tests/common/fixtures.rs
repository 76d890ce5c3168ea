use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use catdog::{
    AppState, ClassifierError, ImageClassifier, InputShape, InputTensor, LabelSet, Model,
    Normalization, ServerConfig,
};
use http_body_util::BodyExt;
use image::{ImageBuffer, Rgb};
use tower::ServiceExt;

/// Model double that returns a fixed output and counts its calls
pub struct FixedModel {
    pub output: Vec<f32>,
    pub declared: Option<InputShape>,
    pub calls: Arc<AtomicUsize>,
}

impl FixedModel {
    pub fn new(output: Vec<f32>) -> Self {
        Self {
            output,
            declared: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_declared_shape(mut self, shape: InputShape) -> Self {
        self.declared = Some(shape);
        self
    }
}

impl Model for FixedModel {
    fn input_shape(&self) -> Option<InputShape> {
        self.declared
    }

    fn infer(&self, input: InputTensor) -> Result<Vec<f32>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(input.data().len(), input.shape().iter().product::<usize>());
        Ok(self.output.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Classifier around a `FixedModel` with the default cat/dog labels and a small input
pub fn fixed_classifier(output: Vec<f32>) -> ImageClassifier {
    ImageClassifier::new(
        Box::new(FixedModel::new(output)),
        LabelSet::default(),
        InputShape::square(16),
        Normalization::Unit,
    )
}

/// Encodes a solid-colour PNG of the given size
pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Server config rooted in a temporary directory (keep the `TempDir` alive)
pub fn test_config() -> (ServerConfig, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let config = ServerConfig {
        uploads_dir: dir.path().join("uploads"),
        public_dir: dir.path().join("public"),
        ..ServerConfig::default()
    };
    (config, dir)
}

/// State with a ready classifier returning `output`
pub fn ready_state(output: Vec<f32>) -> (AppState, tempfile::TempDir) {
    let (config, dir) = test_config();
    (AppState::with_classifier(config, fixed_classifier(output)), dir)
}

/// State whose model has not finished loading
pub fn loading_state() -> (AppState, tempfile::TempDir) {
    let (config, dir) = test_config();
    (AppState::new(config), dir)
}

pub const BOUNDARY: &str = "catdog-test-boundary";

/// Build a multipart/form-data body with a single file field
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("valid request")
}

pub fn json_request(uri: &str, json: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .expect("valid request")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

/// Send one request through the router
pub async fn send(state: &AppState, request: Request<Body>) -> Response<Body> {
    catdog::router(state.clone())
        .oneshot(request)
        .await
        .expect("router is infallible")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("readable body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("JSON body")
}
