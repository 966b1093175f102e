//! HTTP/WebSocket server for the web display

use axum::{
    routing::get,
    Router,
};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{AppConfig, UiConfig};
use crate::display::{DisplayMode, MeterFrame};
use crate::meter::ReadingHandle;
use crate::ui::handlers;
use crate::ui::websocket;

/// Shared application state
pub struct AppState {
    /// Consumer side of the meter
    pub reading: ReadingHandle,
    /// Current rendering choice
    display_mode: RwLock<DisplayMode>,
    /// Push period for websocket clients
    pub poll_interval: Duration,
    /// Where to persist the display mode, if anywhere
    config_path: Option<PathBuf>,
    /// Config the display mode is persisted with
    config: RwLock<AppConfig>,
}

impl AppState {
    pub fn new(reading: ReadingHandle, config: AppConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            reading,
            display_mode: RwLock::new(config.ui.display_mode),
            poll_interval: config.ui.poll_interval(),
            config_path,
            config: RwLock::new(config),
        }
    }

    pub fn display_mode(&self) -> DisplayMode {
        *self.display_mode.read()
    }

    /// Switch rendering and persist the choice.
    ///
    /// Nothing changes unless the config file was written.
    pub fn set_display_mode(&self, mode: DisplayMode) -> crate::Result<()> {
        let mut config = self.config.write();
        let mut updated = config.clone();
        updated.ui.display_mode = mode;

        if let Some(path) = &self.config_path {
            updated.save(path)?;
            tracing::debug!("Persisted display mode '{}' to {}", mode, path.display());
        }

        *config = updated;
        *self.display_mode.write() = mode;
        Ok(())
    }

    /// Frame for the current reading and mode
    pub fn frame(&self) -> MeterFrame {
        MeterFrame::new(self.reading.get(), self.display_mode())
    }
}

/// Run [`AppState::set_display_mode`] on the blocking pool
pub async fn apply_display_mode(state: Arc<AppState>, mode: DisplayMode) -> crate::Result<()> {
    tokio::task::spawn_blocking(move || state.set_display_mode(mode))
        .await
        .map_err(|e| crate::Error::Io(std::io::Error::other(e)))?
}

/// Web server for the meter display
pub struct WebServer {
    config: UiConfig,
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server
    pub fn new(config: UiConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get shared state
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the router
    pub fn build_router(&self) -> Router {
        let router = router(self.state.clone());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router.layer(cors)
        } else {
            router
        }
    }

    /// Start the web server
    pub async fn start(&self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.http_port)
            .parse()?;

        let router = self.build_router();

        tracing::info!("Web server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }

    /// Start the web server in the background
    pub fn start_background(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.start().await })
    }
}

/// Routes without middleware
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/reading", get(handlers::get_reading))
        .route(
            "/api/display-mode",
            get(handlers::get_display_mode).put(handlers::set_display_mode),
        )
        .route("/api/devices", get(handlers::get_devices))
        .route("/ws", get(websocket::websocket_handler))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::LevelDetector;

    #[test]
    fn test_failed_save_keeps_display_mode() {
        // A regular file as parent directory makes the save fail
        let blocker = std::env::temp_dir().join(format!("vu-meter-blocker-{}", std::process::id()));
        std::fs::write(&blocker, b"").unwrap();
        let path = blocker.join("config.toml");

        let detector = LevelDetector::new();
        let state = AppState::new(detector.handle(), AppConfig::default(), Some(path));

        assert!(state.set_display_mode(DisplayMode::Needle).is_err());
        assert_eq!(state.display_mode(), DisplayMode::Led);
        assert_eq!(state.config.read().ui.display_mode, DisplayMode::Led);
        assert_eq!(state.frame().mode, DisplayMode::Led);

        std::fs::remove_file(&blocker).unwrap();
    }

    #[test]
    fn test_set_display_mode_without_path() {
        let detector = LevelDetector::new();
        let state = AppState::new(detector.handle(), AppConfig::default(), None);

        state.set_display_mode(DisplayMode::Needle).unwrap();
        assert_eq!(state.display_mode(), DisplayMode::Needle);
        assert_eq!(state.config.read().ui.display_mode, DisplayMode::Needle);
    }

    #[tokio::test]
    async fn test_apply_display_mode_persists() {
        let dir = std::env::temp_dir().join(format!("vu-meter-apply-{}", std::process::id()));
        let path = dir.join("config.toml");
        let detector = LevelDetector::new();
        let state = Arc::new(AppState::new(
            detector.handle(),
            AppConfig::default(),
            Some(path.clone()),
        ));

        apply_display_mode(state.clone(), DisplayMode::Needle).await.unwrap();
        assert_eq!(state.display_mode(), DisplayMode::Needle);
        assert_eq!(AppConfig::load(&path).unwrap().ui.display_mode, DisplayMode::Needle);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
