//! Audio device enumeration and bus-layout negotiation

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use crate::error::AudioError;

/// Description of an audio device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Device identifier (its name on the default host)
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub is_input: bool,
    pub is_output: bool,
    /// System default for its direction
    pub is_default: bool,
    /// Supported sample-rate ranges as `(min, max)`
    pub sample_rates: Vec<(u32, u32)>,
    /// Supported channel counts
    pub channels: Vec<u16>,
}

/// A resolved cpal device
pub struct DeviceHandle {
    id: String,
    device: cpal::Device,
}

impl DeviceHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn device(&self) -> &cpal::Device {
        &self.device
    }

    pub fn into_inner(self) -> cpal::Device {
        self.device
    }
}

/// Whether an input/output channel pairing can be metered and passed through.
///
/// Both buses must be enabled, have the same width, and be mono or stereo.
pub fn is_layout_supported(input_channels: u16, output_channels: u16) -> bool {
    if input_channels == 0 || output_channels == 0 {
        return false;
    }
    if input_channels != output_channels {
        return false;
    }
    matches!(input_channels, 1 | 2)
}

/// Validate a layout, returning the shared channel count
pub fn negotiate_layout(input_channels: u16, output_channels: u16) -> Result<u16, AudioError> {
    if is_layout_supported(input_channels, output_channels) {
        Ok(input_channels)
    } else {
        Err(AudioError::UnsupportedLayout {
            input: input_channels,
            output: output_channels,
        })
    }
}

fn collect_ranges<I>(configs: I) -> (Vec<(u32, u32)>, Vec<u16>)
where
    I: Iterator<Item = cpal::SupportedStreamConfigRange>,
{
    let mut rates = Vec::new();
    let mut channels = Vec::new();
    for range in configs {
        let rate = (range.min_sample_rate().0, range.max_sample_rate().0);
        if !rates.contains(&rate) {
            rates.push(rate);
        }
        if !channels.contains(&range.channels()) {
            channels.push(range.channels());
        }
    }
    channels.sort_unstable();
    (rates, channels)
}

/// List all devices on the default host
pub fn list_devices() -> Vec<AudioDevice> {
    let host = cpal::default_host();

    let default_input = host.default_input_device().and_then(|d| d.name().ok());
    let default_output = host.default_output_device().and_then(|d| d.name().ok());

    let devices = match host.devices() {
        Ok(devices) => devices,
        Err(e) => {
            tracing::warn!("Failed to enumerate audio devices: {}", e);
            return Vec::new();
        }
    };

    devices
        .filter_map(|device| {
            let name = device.name().ok()?;

            let (mut sample_rates, mut channels) = device
                .supported_input_configs()
                .map(collect_ranges)
                .unwrap_or_default();
            let is_input = !channels.is_empty();

            let (out_rates, out_channels) = device
                .supported_output_configs()
                .map(collect_ranges)
                .unwrap_or_default();
            let is_output = !out_channels.is_empty();

            for rate in out_rates {
                if !sample_rates.contains(&rate) {
                    sample_rates.push(rate);
                }
            }
            for ch in out_channels {
                if !channels.contains(&ch) {
                    channels.push(ch);
                }
            }
            channels.sort_unstable();

            let is_default = (is_input && default_input.as_deref() == Some(name.as_str()))
                || (is_output && default_output.as_deref() == Some(name.as_str()));

            Some(AudioDevice {
                id: name.clone(),
                name,
                is_input,
                is_output,
                is_default,
                sample_rates,
                channels,
            })
        })
        .collect()
}

/// Resolve a device by ID on the default host
pub fn get_device_by_id(device_id: &str) -> Result<DeviceHandle, AudioError> {
    let host = cpal::default_host();
    for device in host.devices()? {
        if device.name().ok().as_deref() == Some(device_id) {
            return Ok(DeviceHandle {
                id: device_id.to_string(),
                device,
            });
        }
    }
    Err(AudioError::DeviceNotFound(device_id.to_string()))
}

/// The given input device, or the system default when `None`
pub fn input_device(device_id: Option<&str>) -> Result<DeviceHandle, AudioError> {
    match device_id {
        Some(id) => get_device_by_id(id),
        None => {
            let device = cpal::default_host()
                .default_input_device()
                .ok_or(AudioError::NoDefaultDevice("input"))?;
            Ok(DeviceHandle {
                id: device.name()?,
                device,
            })
        }
    }
}

/// The given output device, or the system default when `None`
pub fn output_device(device_id: Option<&str>) -> Result<DeviceHandle, AudioError> {
    match device_id {
        Some(id) => get_device_by_id(id),
        None => {
            let device = cpal::default_host()
                .default_output_device()
                .ok_or(AudioError::NoDefaultDevice("output"))?;
            Ok(DeviceHandle {
                id: device.name()?,
                device,
            })
        }
    }
}
