use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, info, warn};

use super::upload::{decode_data_url, read_image_field};
use super::{ApiError, AppState};
use crate::classifier::ImageClassifier;
use crate::models::{LabelSet, Prediction};

const MODEL_NAME: &str = "Cat vs Dog classifier";
const MODEL_DESCRIPTION: &str = "Image classification with a pretrained convolutional network";

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub class: String,
    pub class_name: String,
    pub confidence: f64,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ScoreEntry {
    pub class: String,
    pub confidence: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    pub success: bool,
    pub classification: String,
    pub confidence: String,
    pub all_predictions: Vec<ScoreEntry>,
    pub image_url: String,
}

/// Run inference on the blocking pool so request handling stays responsive
pub async fn classify_blocking(
    classifier: Arc<ImageClassifier>,
    bytes: Vec<u8>,
) -> Result<Prediction, ApiError> {
    tokio::task::spawn_blocking(move || classifier.classify_bytes(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("inference task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// `POST /predict`: base64 data URL in, prediction out. Always answers 200.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    match run_predict(&state, payload).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            warn!("Prediction failed: {}", err);
            Json(json!({ "error": err.to_string() })).into_response()
        }
    }
}

async fn run_predict(
    state: &AppState,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<PredictResponse, ApiError> {
    let classifier = state.classifier()?;
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let bytes = decode_data_url(&request.image)?;

    let prediction = classify_blocking(classifier, bytes).await?;
    info!("Predicted {} ({:.2}%)", prediction.class, prediction.confidence);

    Ok(PredictResponse {
        class: prediction.class,
        class_name: prediction.class_name,
        confidence: prediction.confidence,
        success: true,
    })
}

/// `POST /api/classify`: multipart upload, stored on disk, then classified
pub async fn classify(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let upload = read_image_field(&mut multipart, state.config().max_upload_bytes).await?;
    debug!(
        "Received upload {} ({}, {} bytes)",
        upload.file_name,
        upload.content_type,
        upload.bytes.len()
    );
    let classifier = state.classifier()?;

    let stored = state.uploads().store(&upload.file_name, &upload.bytes).await?;
    let prediction = classify_blocking(classifier, upload.bytes)
        .await
        .inspect_err(|e| error!("Classification of {} failed: {}", stored.file_name, e))?;
    info!(
        "Classified {} as {} ({:.2}%)",
        stored.file_name, prediction.class, prediction.confidence
    );

    Ok(Json(ClassifyResponse {
        success: true,
        classification: prediction.class,
        confidence: format!("{:.2}", prediction.confidence),
        all_predictions: prediction
            .scores
            .into_iter()
            .map(|score| ScoreEntry {
                class: score.class,
                confidence: format!("{:.2}", score.confidence),
            })
            .collect(),
        image_url: stored.url,
    }))
}

/// `GET /api/health`
pub async fn api_health() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({ "status": "ok", "timestamp": timestamp }))
}

/// `GET /api/model-info`
pub async fn model_info(State(state): State<AppState>) -> Json<Value> {
    let classifier = state.classifier().ok();
    let classes = classifier
        .as_ref()
        .map(|c| c.labels().ids())
        .unwrap_or_else(|| LabelSet::default().ids());
    let image_size = classifier.as_ref().map(|c| c.input_shape().height);

    Json(json!({
        "model": MODEL_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "classes": classes,
        "description": MODEL_DESCRIPTION,
        "ready": state.is_ready(),
        "imageSize": image_size,
    }))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "Server is running" }))
}

/// `GET /`: the browser front-end when present, a usage hint otherwise
pub async fn index(State(state): State<AppState>) -> Response {
    let path = state.config().public_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(_) => (
            StatusCode::OK,
            "Server running! Use POST /predict with a base64 image.",
        )
            .into_response(),
    }
}
