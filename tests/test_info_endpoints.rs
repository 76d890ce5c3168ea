mod common;

use axum::http::StatusCode;
use http_body_util::BodyExt;

use common::*;

#[tokio::test]
async fn test_api_health() -> anyhow::Result<()> {
    let (state, _dir) = loading_state();

    let response = send(&state, get_request("/api/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    let timestamp = body["timestamp"].as_str().expect("timestamp");
    assert!(timestamp.contains('T'));
    Ok(())
}

#[tokio::test]
async fn test_root_health() -> anyhow::Result<()> {
    let (state, _dir) = loading_state();

    let body = body_json(send(&state, get_request("/health")).await).await;
    assert_eq!(body["status"], "OK");
    Ok(())
}

#[tokio::test]
async fn test_model_info_tracks_readiness() -> anyhow::Result<()> {
    let (loading, _dir) = loading_state();
    let body = body_json(send(&loading, get_request("/api/model-info")).await).await;
    assert_eq!(body["ready"], false);
    assert_eq!(body["classes"], serde_json::json!(["cat", "dog"]));
    assert!(body["imageSize"].is_null());

    let (ready, _dir) = ready_state(vec![0.5]);
    let body = body_json(send(&ready, get_request("/api/model-info")).await).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["imageSize"], 16);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[tokio::test]
async fn test_index_falls_back_to_hint() -> anyhow::Result<()> {
    let (state, _dir) = loading_state();

    let response = send(&state, get_request("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await?.to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("POST /predict"));
    Ok(())
}

#[tokio::test]
async fn test_index_serves_public_page() -> anyhow::Result<()> {
    let (config, _dir) = test_config();
    std::fs::create_dir_all(&config.public_dir)?;
    std::fs::write(config.public_dir.join("index.html"), "<h1>Cat or dog?</h1>")?;
    let state = catdog::AppState::new(config);

    let response = send(&state, get_request("/")).await;
    let bytes = response.into_body().collect().await?.to_bytes();
    assert_eq!(&bytes[..], b"<h1>Cat or dog?</h1>");
    Ok(())
}
