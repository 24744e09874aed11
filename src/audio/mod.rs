//! Audio subsystem: frames, resampling, devices and capture

pub mod buffer;
pub mod capture;
pub mod device;
pub mod resample;
pub mod tone;

pub use buffer::{AudioFrame, RingBuffer};
pub use capture::{CapturePipeline, CaptureSource, CaptureState, CpalCaptureSource};
pub use device::{list_devices, AudioDevice, AudioDeviceInfo};
pub use resample::resample;
