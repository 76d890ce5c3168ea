mod error;
pub mod handlers;
pub mod upload;

use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::classifier::{ClassifierConfig, ImageClassifier, load_classifier};
use crate::config::ServerConfig;

pub use error::{ApiError, ErrorBody};
pub use upload::{StoredUpload, UploadStore};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    classifier: OnceLock<Arc<ImageClassifier>>,
    uploads: UploadStore,
    config: ServerConfig,
}

impl AppState {
    /// State without a model; predictions fail with `ModelNotLoaded` until one is set
    pub fn new(config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                classifier: OnceLock::new(),
                uploads: UploadStore::new(config.uploads_dir.clone()),
                config,
            }),
        }
    }

    pub fn with_classifier(config: ServerConfig, classifier: ImageClassifier) -> Self {
        let state = Self::new(config);
        state.set_classifier(classifier);
        state
    }

    /// Publish the loaded model. Returns false if a model was already set.
    pub fn set_classifier(&self, classifier: ImageClassifier) -> bool {
        self.inner.classifier.set(Arc::new(classifier)).is_ok()
    }

    pub fn classifier(&self) -> Result<Arc<ImageClassifier>, ApiError> {
        self.inner
            .classifier
            .get()
            .cloned()
            .ok_or(ApiError::ModelNotLoaded)
    }

    pub fn is_ready(&self) -> bool {
        self.inner.classifier.get().is_some()
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    let config = state.config().clone();

    let api = Router::new()
        .route("/health", get(handlers::api_health))
        .route("/model-info", get(handlers::model_info))
        .route(
            "/classify",
            post(handlers::classify)
                .layer(DefaultBodyLimit::max(config.max_upload_bytes + MULTIPART_OVERHEAD)),
        );

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(
            "/predict",
            post(handlers::predict).layer(DefaultBodyLimit::max(config.max_json_bytes)),
        )
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load the model on the blocking pool and publish it into `state`.
/// On failure the model stays unset and predictions keep answering `ModelNotLoaded`.
pub async fn load_in_background(state: AppState, config: ClassifierConfig) {
    match tokio::task::spawn_blocking(move || load_classifier(&config)).await {
        Ok(Ok(classifier)) => {
            if state.set_classifier(classifier) {
                info!("Model loaded, ready to classify");
            } else {
                warn!("Model was already loaded, keeping the existing one");
            }
        }
        Ok(Err(e)) => error!("Failed to load model: {}", e),
        Err(e) => error!("Model loading task failed: {}", e),
    }
}

/// Bind, start loading the model, and serve until Ctrl-C
pub async fn serve(config: ServerConfig, classifier_config: ClassifierConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    let state = AppState::new(config);
    tokio::spawn(load_in_background(state.clone(), classifier_config));

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
