//! Audio device enumeration

use cpal::traits::{DeviceTrait, HostTrait};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::Serialize;
use std::time::Duration;

use crate::error::AudioError;

/// Rates checked when listing device capabilities
const CANDIDATE_RATES: [u32; 6] = [16000, 22050, 32000, 44100, 48000, 96000];

/// Device summary shown to the user
#[derive(Debug, Clone, Serialize)]
pub struct AudioDeviceInfo {
    pub id: String,
    pub name: String,
    pub is_input: bool,
    pub is_output: bool,
    pub is_default: bool,
    pub sample_rates: Vec<u32>,
    pub channels: Vec<u16>,
}

/// Wrapper around cpal device
pub struct AudioDevice {
    inner: cpal::Device,
    pub name: String,
}

impl AudioDevice {
    pub fn from_cpal(device: cpal::Device) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        Self { inner: device, name }
    }

    pub fn into_inner(self) -> cpal::Device {
        self.inner
    }

    /// Default input config, or `CaptureUnavailable` when the device
    /// refuses to record
    pub fn default_input_config(&self) -> Result<cpal::SupportedStreamConfig, AudioError> {
        self.inner
            .default_input_config()
            .map_err(|e| AudioError::CaptureUnavailable(e.to_string()))
    }

    pub fn default_output_config(&self) -> Result<cpal::SupportedStreamConfig, AudioError> {
        self.inner
            .default_output_config()
            .map_err(|e| AudioError::DeviceNotFound(e.to_string()))
    }

    /// Whether the device can record at `rate` with `channels` channels
    pub fn supports_input_rate(&self, rate: u32, channels: u16) -> bool {
        let rate = cpal::SampleRate(rate);
        self.inner
            .supported_input_configs()
            .map(|mut configs| {
                configs.any(|c| {
                    c.channels() == channels
                        && c.sample_format() == cpal::SampleFormat::F32
                        && rate >= c.min_sample_rate()
                        && rate <= c.max_sample_rate()
                })
            })
            .unwrap_or(false)
    }

    /// Whether the device can play at `rate` with `channels` channels
    pub fn supports_output_rate(&self, rate: u32, channels: u16) -> bool {
        let rate = cpal::SampleRate(rate);
        self.inner
            .supported_output_configs()
            .map(|mut configs| {
                configs.any(|c| {
                    c.channels() == channels
                        && c.sample_format() == cpal::SampleFormat::F32
                        && rate >= c.min_sample_rate()
                        && rate <= c.max_sample_rate()
                })
            })
            .unwrap_or(false)
    }
}

/// List all available audio devices
pub fn list_devices() -> Vec<AudioDeviceInfo> {
    let host = cpal::default_host();
    let mut devices: Vec<AudioDeviceInfo> = Vec::new();

    let default_input_name = host.default_input_device().and_then(|d| d.name().ok());
    let default_output_name = host.default_output_device().and_then(|d| d.name().ok());

    if let Ok(input_devices) = host.input_devices() {
        for device in input_devices {
            if let Ok(name) = device.name() {
                let (sample_rates, channels) = get_device_capabilities(&device, true);
                devices.push(AudioDeviceInfo {
                    id: format!("input:{}", name),
                    is_default: default_input_name.as_ref() == Some(&name),
                    name,
                    is_input: true,
                    is_output: false,
                    sample_rates,
                    channels,
                });
            }
        }
    }

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let Ok(name) = device.name() {
                let is_default = default_output_name.as_ref() == Some(&name);
                let (sample_rates, channels) = get_device_capabilities(&device, false);
                devices.push(AudioDeviceInfo {
                    id: format!("output:{}", name),
                    name,
                    is_input: false,
                    is_output: true,
                    is_default,
                    sample_rates,
                    channels,
                });
            }
        }
    }

    devices
}

fn get_device_capabilities(device: &cpal::Device, is_input: bool) -> (Vec<u32>, Vec<u16>) {
    let configs: Vec<cpal::SupportedStreamConfigRange> = if is_input {
        device.supported_input_configs().map(|c| c.collect()).unwrap_or_default()
    } else {
        device.supported_output_configs().map(|c| c.collect()).unwrap_or_default()
    };

    let mut sample_rates = Vec::new();
    let mut channels = Vec::new();
    for config in &configs {
        for rate_val in CANDIDATE_RATES {
            let rate = cpal::SampleRate(rate_val);
            if rate >= config.min_sample_rate()
                && rate <= config.max_sample_rate()
                && !sample_rates.contains(&rate_val)
            {
                sample_rates.push(rate_val);
            }
        }
        if !channels.contains(&config.channels()) {
            channels.push(config.channels());
        }
    }

    sample_rates.sort_unstable();
    channels.sort_unstable();
    (sample_rates, channels)
}

/// Get a device by its ID (`input:<name>` or `output:<name>`)
pub fn get_device_by_id(id: &str) -> Result<AudioDevice, AudioError> {
    let host = cpal::default_host();

    let (is_input, name) = if let Some(name) = id.strip_prefix("input:") {
        (true, name)
    } else if let Some(name) = id.strip_prefix("output:") {
        (false, name)
    } else {
        (true, id)
    };

    let devices = if is_input {
        host.input_devices()
    } else {
        host.output_devices()
    }
    .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;

    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(AudioDevice::from_cpal(device));
        }
    }

    Err(AudioError::DeviceNotFound(id.to_string()))
}

/// Get default input device
pub fn get_default_input_device() -> Result<AudioDevice, AudioError> {
    cpal::default_host()
        .default_input_device()
        .map(AudioDevice::from_cpal)
        .ok_or_else(|| AudioError::CaptureUnavailable("No default input device".to_string()))
}

/// Get default output device
pub fn get_default_output_device() -> Result<AudioDevice, AudioError> {
    cpal::default_host()
        .default_output_device()
        .map(AudioDevice::from_cpal)
        .ok_or_else(|| AudioError::DeviceNotFound("No default output device".to_string()))
}

/// Configured input device, or the default one
pub fn resolve_input_device(device_id: Option<&str>) -> Result<AudioDevice, AudioError> {
    match device_id {
        Some(id) => get_device_by_id(id).map_err(|e| AudioError::CaptureUnavailable(e.to_string())),
        None => get_default_input_device(),
    }
}

/// Configured output device, or the default one
pub fn resolve_output_device(device_id: Option<&str>) -> Result<AudioDevice, AudioError> {
    match device_id {
        Some(id) => get_device_by_id(id),
        None => get_default_output_device(),
    }
}

/// What a stream thread reported while it was being opened
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StreamReady<E> {
    Ready,
    Failed(E),
    /// Nothing within the timeout; the thread may still be stuck in the
    /// backend and must be abandoned, not joined
    TimedOut,
    /// The thread exited without reporting
    Exited,
}

/// Wait at most `timeout` for a stream thread's ready report
pub(crate) fn wait_stream_ready<E>(ready: &Receiver<Result<(), E>>, timeout: Duration) -> StreamReady<E> {
    match ready.recv_timeout(timeout) {
        Ok(Ok(())) => StreamReady::Ready,
        Ok(Err(e)) => StreamReady::Failed(e),
        Err(RecvTimeoutError::Timeout) => StreamReady::TimedOut,
        Err(RecvTimeoutError::Disconnected) => StreamReady::Exited,
    }
}
