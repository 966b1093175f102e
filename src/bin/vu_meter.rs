//! VU Meter Application
//!
//! Meters the default (or configured) input device, passes the signal through
//! to an output device and serves the reading to the web display.
//!
//! Usage: `vu-meter [config.toml] [led|needle]`

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vu_meter::{
    audio::{
        buffer::create_shared_buffer,
        capture::AudioCapture,
        device::{list_devices, negotiate_layout},
        playback::AudioPlayback,
    },
    config::AppConfig,
    constants::RING_BUFFER_CAPACITY,
    display::{render_led_bar, DisplayMode},
    ui::{AppState, WebServer},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting VU meter");

    let mut args = std::env::args().skip(1);
    let config_path: Option<PathBuf> = args.next().map(PathBuf::from).or_else(AppConfig::default_path);
    let mut config = match &config_path {
        Some(path) => AppConfig::load_or_default(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::default(),
    };

    if let Some(mode) = args.next() {
        config.ui.display_mode = mode
            .parse::<DisplayMode>()
            .map_err(anyhow::Error::msg)?;
    }

    println!("\n=== Available Input Devices ===");
    for device in list_devices().iter().filter(|d| d.is_input) {
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {}{}", device.name, default_marker);
        println!("    Sample rates: {:?}", device.sample_rates);
        println!("    Channels: {:?}", device.channels);
    }
    println!();

    let pass_through = if config.audio.pass_through {
        Some(create_shared_buffer(RING_BUFFER_CAPACITY))
    } else {
        None
    };

    let mut capture = AudioCapture::new(
        config.audio.input_device.as_deref(),
        config.audio.sample_rate,
        config.audio.buffer_size,
        pass_through.clone(),
    )?;

    let mut playback = match &pass_through {
        Some(buffer) => {
            let output_channels =
                AudioPlayback::default_channels(config.audio.output_device.as_deref())?;
            let channels = negotiate_layout(capture.channels(), output_channels)?;
            Some(AudioPlayback::new(
                config.audio.output_device.as_deref(),
                capture.sample_rate(),
                channels,
                config.audio.buffer_size,
                buffer.clone(),
            )?)
        }
        None => None,
    };

    capture.start()?;
    if let Some(playback) = playback.as_mut() {
        playback.start()?;
    }

    let reading = capture.reading_handle();
    let state = Arc::new(AppState::new(reading.clone(), config.clone(), config_path));
    let web_server = WebServer::new(config.ui.clone(), state.clone());
    let _web_handle = web_server.start_background();

    tracing::info!(
        "Web display available at http://{}:{} ({} mode)",
        config.ui.bind_address,
        config.ui.http_port,
        config.ui.display_mode
    );
    tracing::info!("Metering - press Ctrl+C to stop");

    let mut ticker = tokio::time::interval(config.ui.poll_interval());
    let mut last_report = Instant::now();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            _ = ticker.tick() => {
                if let Some(e) = capture.check_errors() {
                    tracing::warn!("Capture stream error: {}", e);
                }
                if let Some(e) = playback.as_ref().and_then(|p| p.check_errors()) {
                    tracing::warn!("Playback stream error: {}", e);
                }

                if last_report.elapsed() >= Duration::from_secs(1) {
                    last_report = Instant::now();
                    let current = reading.get();
                    tracing::info!("{} ({})", render_led_bar(&current, 40), state.display_mode());
                }
            }
        }
    }

    if let Some(playback) = playback.as_mut() {
        playback.stop();
        tracing::info!(
            "Pass-through stopped: {} samples played, {} underruns, {} dropped blocks",
            playback.samples_played(),
            playback.underruns(),
            playback.overflows()
        );
    }
    capture.stop();
    tracing::info!("Capture stopped after {} frames", capture.frames_metered());

    Ok(())
}
