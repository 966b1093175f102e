//! REST handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audio::device::{list_devices, AudioDevice};
use crate::display::{DisplayMode, MeterFrame};
use crate::ui::server::{apply_display_mode, AppState};

/// Body of the display-mode endpoints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayModeBody {
    pub mode: DisplayMode,
}

/// Latest reading with display geometry
pub async fn get_reading(State(state): State<Arc<AppState>>) -> Json<MeterFrame> {
    Json(state.frame())
}

pub async fn get_display_mode(State(state): State<Arc<AppState>>) -> Json<DisplayModeBody> {
    Json(DisplayModeBody {
        mode: state.display_mode(),
    })
}

pub async fn set_display_mode(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DisplayModeBody>,
) -> Result<Json<DisplayModeBody>, (StatusCode, String)> {
    apply_display_mode(state, body.mode).await.map_err(|e| {
        tracing::warn!("Failed to persist display mode: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    tracing::info!("Display mode set to '{}'", body.mode);
    Ok(Json(body))
}

pub async fn get_devices() -> Json<Vec<AudioDevice>> {
    let devices = tokio::task::spawn_blocking(list_devices)
        .await
        .unwrap_or_default();
    Json(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::meter::{EngineConfig, LevelDetector};
    use crate::ui::server::router;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn state_with(detector: &LevelDetector) -> Arc<AppState> {
        Arc::new(AppState::new(detector.handle(), AppConfig::default(), None))
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_reading_reflects_detector() {
        let mut detector = LevelDetector::new();
        detector.reset(EngineConfig::new(44_100.0)).unwrap();
        let loud = vec![1.0f32; 88_200];
        detector.process_block(&[&loud[..]], loud.len());

        let app = router(state_with(&detector));
        let response = app
            .oneshot(Request::get("/api/reading").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let frame: MeterFrame = body_json(response).await;
        assert_eq!(frame.reading.vu_value, 3.0);
        assert!(frame.reading.peak_hit);
        assert_eq!(frame.colour, "#ff0000");
        assert_eq!(frame.mode, DisplayMode::Led);
    }

    #[tokio::test]
    async fn test_set_display_mode() {
        let detector = LevelDetector::new();
        let state = state_with(&detector);
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::put("/api/display-mode")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"mode":"needle"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.display_mode(), DisplayMode::Needle);

        let response = app
            .oneshot(Request::get("/api/display-mode").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body: DisplayModeBody = body_json(response).await;
        assert_eq!(body.mode, DisplayMode::Needle);
    }

    #[tokio::test]
    async fn test_unknown_display_mode_rejected() {
        let detector = LevelDetector::new();
        let state = state_with(&detector);
        let response = router(state.clone())
            .oneshot(
                Request::put("/api/display-mode")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"mode":"dial"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert_eq!(state.display_mode(), DisplayMode::Led);
    }

    #[tokio::test]
    async fn test_failed_persist_returns_error_and_keeps_mode() {
        let blocker = std::env::temp_dir().join(format!("vu-meter-ui-blocker-{}", std::process::id()));
        std::fs::write(&blocker, b"").unwrap();
        let detector = LevelDetector::new();
        let state = Arc::new(AppState::new(
            detector.handle(),
            AppConfig::default(),
            Some(blocker.join("config.toml")),
        ));

        let response = router(state.clone())
            .oneshot(
                Request::put("/api/display-mode")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"mode":"needle"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.display_mode(), DisplayMode::Led);

        std::fs::remove_file(&blocker).unwrap();
    }

    #[tokio::test]
    async fn test_display_mode_is_persisted() {
        let dir = std::env::temp_dir().join(format!("vu-meter-ui-{}", std::process::id()));
        let path = dir.join("config.toml");
        let detector = LevelDetector::new();
        let state = AppState::new(detector.handle(), AppConfig::default(), Some(path.clone()));

        state.set_display_mode(DisplayMode::Needle).unwrap();
        let saved = AppConfig::load(&path).unwrap();
        assert_eq!(saved.ui.display_mode, DisplayMode::Needle);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
