//! Error types

use thiserror::Error;

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    #[error("Meter error: {0}")]
    Meter(#[from] MeterError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-level result
pub type Result<T> = std::result::Result<T, Error>;

/// Rejected engine configuration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeterError {
    #[error("Sample rate must be a positive finite number, got {0}")]
    InvalidSampleRate(f64),

    #[error("Integration time constant must be a positive finite number, got {0}")]
    InvalidTimeConstant(f64),
}

/// Audio device and stream errors
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("No default {0} device available")]
    NoDefaultDevice(&'static str),

    #[error("Unsupported bus layout: {input} in / {output} out")]
    UnsupportedLayout { input: u16, output: u16 },

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Device error: {0}")]
    DeviceError(String),

    #[error(transparent)]
    Meter(#[from] MeterError),
}

impl From<cpal::DefaultStreamConfigError> for AudioError {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        AudioError::DeviceError(e.to_string())
    }
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(e: cpal::BuildStreamError) -> Self {
        AudioError::StreamError(e.to_string())
    }
}

impl From<cpal::PlayStreamError> for AudioError {
    fn from(e: cpal::PlayStreamError) -> Self {
        AudioError::StreamError(e.to_string())
    }
}

impl From<cpal::DevicesError> for AudioError {
    fn from(e: cpal::DevicesError) -> Self {
        AudioError::DeviceError(e.to_string())
    }
}

impl From<cpal::DeviceNameError> for AudioError {
    fn from(e: cpal::DeviceNameError) -> Self {
        AudioError::DeviceError(e.to_string())
    }
}
