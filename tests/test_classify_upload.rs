//! Integration tests for `POST /api/classify` (multipart uploads).

mod common;

use axum::http::StatusCode;

use common::*;

#[tokio::test]
async fn test_classify_stores_upload_and_reports_scores() -> anyhow::Result<()> {
    let (state, dir) = ready_state(vec![0.25]);
    let png = solid_png(20, 20, [90, 60, 30]);

    let response = send(
        &state,
        multipart_request("/api/classify", multipart_body("image", "my cat.png", "image/png", &png)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["classification"], "cat");
    assert_eq!(body["confidence"], "75.00");

    let all = body["allPredictions"].as_array().expect("allPredictions array");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["class"], "cat");
    assert_eq!(all[0]["confidence"], "75.00");
    assert_eq!(all[1]["class"], "dog");
    assert_eq!(all[1]["confidence"], "25.00");

    let url = body["imageUrl"].as_str().expect("imageUrl");
    let file_name = url.strip_prefix("/uploads/").expect("uploads url");
    assert!(file_name.ends_with("-my_cat.png"));

    let stored = std::fs::read(dir.path().join("uploads").join(file_name))?;
    assert_eq!(stored, png);
    Ok(())
}

#[tokio::test]
async fn test_classify_rejects_non_image() -> anyhow::Result<()> {
    let (state, dir) = ready_state(vec![0.9]);

    let response = send(
        &state,
        multipart_request(
            "/api/classify",
            multipart_body("image", "notes.txt", "text/plain", b"hello"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["kind"], "upload_rejected");
    assert!(!dir.path().join("uploads").exists());
    Ok(())
}

#[tokio::test]
async fn test_classify_rejects_oversized_upload() -> anyhow::Result<()> {
    let (mut config, _dir) = test_config();
    config.max_upload_bytes = 1024;
    let state = catdog::AppState::with_classifier(config, fixed_classifier(vec![0.9]));
    let big = vec![0u8; 4096];

    let response = send(
        &state,
        multipart_request("/api/classify", multipart_body("image", "big.png", "image/png", &big)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["kind"], "upload_rejected");
    Ok(())
}

#[tokio::test]
async fn test_classify_without_image_field() -> anyhow::Result<()> {
    let (state, _dir) = ready_state(vec![0.9]);

    let response = send(
        &state,
        multipart_request("/api/classify", multipart_body("photo", "cat.png", "image/png", b"x")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "bad request: no image uploaded");
    Ok(())
}

#[tokio::test]
async fn test_classify_before_model_loaded() -> anyhow::Result<()> {
    let (state, _dir) = loading_state();
    let png = solid_png(4, 4, [1, 2, 3]);

    let response = send(
        &state,
        multipart_request("/api/classify", multipart_body("image", "cat.png", "image/png", &png)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["kind"], "model_not_loaded");
    Ok(())
}

#[tokio::test]
async fn test_classify_corrupt_image() -> anyhow::Result<()> {
    let (state, _dir) = ready_state(vec![0.9]);

    let response = send(
        &state,
        multipart_request(
            "/api/classify",
            multipart_body("image", "broken.png", "image/png", b"garbage bytes"),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["kind"], "preprocessing_failure");
    Ok(())
}
