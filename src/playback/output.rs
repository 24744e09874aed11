//! cpal playback engine
//!
//! Units are queued in a lock-free ring buffer and drained by the output
//! callback one after another, which is what makes per-chunk playback
//! gapless. The output stream is opened on first use and torn down by
//! [`PlaybackEngine::release`].

use bytes::Bytes;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::{create_shared_buffer, AudioFrame, RingBuffer, SharedRingBuffer};
use crate::audio::device::{resolve_output_device, wait_stream_ready, StreamReady};
use crate::audio::resample::interpolate_linear;
use crate::constants::{DEVICE_OPEN_TIMEOUT_MS, TARGET_SAMPLE_RATE};
use crate::error::PlaybackError;
use crate::playback::{EngineStats, PlaybackEngine};

struct OutputStream {
    sample_rate: u32,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl OutputStream {
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Ask the thread to stop without waiting for it
    fn abandon(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.thread_handle.take();
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Speaker output through cpal
pub struct CpalPlayback {
    device_id: Option<String>,
    queue: SharedRingBuffer,
    output: Mutex<Option<OutputStream>>,
}

impl CpalPlayback {
    pub fn new(device_id: Option<String>, queue_capacity: usize) -> Self {
        Self {
            device_id,
            queue: create_shared_buffer(queue_capacity),
            output: Mutex::new(None),
        }
    }

    /// Open the output stream if needed, returning its sample rate
    fn ensure_output(&self) -> Result<u32, PlaybackError> {
        if let Some(stream) = self.output.lock().as_ref() {
            return Ok(stream.sample_rate);
        }

        // Opened without the lock held so release() and stats() never wait
        // on the backend
        let stream = open_output(self.device_id.as_deref(), self.queue.clone())?;

        let mut output = self.output.lock();
        match output.as_ref() {
            Some(existing) => Ok(existing.sample_rate),
            None => {
                let rate = stream.sample_rate;
                *output = Some(stream);
                Ok(rate)
            }
        }
    }
}

impl PlaybackEngine for CpalPlayback {
    fn play_unit(&self, unit: AudioFrame) -> Result<(), PlaybackError> {
        if unit.is_empty() {
            return Ok(());
        }
        if unit.channels != 1 {
            return Err(PlaybackError::Rejected(format!("{} channel unit", unit.channels)));
        }

        let device_rate = self.ensure_output()?;
        let unit = if unit.sample_rate == device_rate {
            unit
        } else {
            AudioFrame::mono(
                interpolate_linear(&unit.samples, unit.sample_rate, device_rate),
                device_rate,
            )
        };

        if self.queue.push(unit) {
            Ok(())
        } else {
            Err(PlaybackError::QueueFull)
        }
    }

    fn play_container(&self, container: Bytes) -> Result<(), PlaybackError> {
        let clip = decode_container(container)?;
        tracing::debug!("Decoded clip: {} samples at {} Hz", clip.samples.len(), clip.sample_rate);
        self.play_unit(clip)
    }

    fn release(&self) {
        self.queue.clear();
        if let Some(mut stream) = self.output.lock().take() {
            stream.stop();
            tracing::info!("Playback output released");
        }
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            queued: self.queue.len(),
            overflows: self.queue.overflow_count(),
            underruns: self.queue.underrun_count(),
        }
    }
}

impl Drop for CpalPlayback {
    fn drop(&mut self) {
        self.release();
    }
}

/// Decode a 16-bit integer WAV clip to one mono unit (channel 0)
pub fn decode_container(container: Bytes) -> Result<AudioFrame, PlaybackError> {
    let reader =
        hound::WavReader::new(Cursor::new(container)).map_err(|e| PlaybackError::Rejected(e.to_string()))?;
    let spec = reader.spec();
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(PlaybackError::Rejected(format!(
            "unsupported {}-bit {:?} clip",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let channels = spec.channels.max(1) as usize;
    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<Result<_, _>>()
        .map_err(|e| PlaybackError::Rejected(e.to_string()))?;

    let mono = samples
        .iter()
        .step_by(channels)
        .map(|&s| s as f32 / 32768.0)
        .collect();
    Ok(AudioFrame::mono(mono, spec.sample_rate))
}

/// Fill one output buffer from the queue, carrying the unit in progress
/// across calls. Each mono sample is copied to every channel of its frame.
fn fill_output(
    data: &mut [f32],
    channels: usize,
    queue: &RingBuffer,
    current: &mut Option<AudioFrame>,
    position: &mut usize,
) {
    for frame in data.chunks_mut(channels.max(1)) {
        let sample = loop {
            if let Some(unit) = current.as_ref() {
                if *position < unit.samples.len() {
                    let s = unit.samples[*position];
                    *position += 1;
                    break s;
                }
            }
            // Running dry right after a unit is an underrun, an idle queue
            // is just silence
            let next = if current.is_some() { queue.pop() } else { queue.try_pop() };
            match next {
                Some(unit) => {
                    *current = Some(unit);
                    *position = 0;
                }
                None => {
                    *current = None;
                    break 0.0;
                }
            }
        };
        frame.fill(sample);
    }
}

fn open_output(device_id: Option<&str>, queue: SharedRingBuffer) -> Result<OutputStream, PlaybackError> {
    let device = resolve_output_device(device_id).map_err(|e| PlaybackError::OutputUnavailable(e.to_string()))?;
    let default_config = device
        .default_output_config()
        .map_err(|e| PlaybackError::OutputUnavailable(e.to_string()))?;
    let channels = default_config.channels().max(1);

    // Wire audio needs no conversion when the device takes 16 kHz
    let sample_rate = if device.supports_output_rate(TARGET_SAMPLE_RATE, channels) {
        TARGET_SAMPLE_RATE
    } else {
        default_config.sample_rate().0
    };

    let config = StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let running = Arc::new(AtomicBool::new(true));
    let running_for_loop = running.clone();
    let (ready_tx, ready_rx) = bounded::<Result<(), PlaybackError>>(1);
    let device_name = device.name.clone();

    let handle = thread::Builder::new()
        .name("voicelink-playback".into())
        .spawn(move || {
            let cpal_device = device.into_inner();
            let mut current: Option<AudioFrame> = None;
            let mut position = 0usize;

            let stream = cpal_device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    fill_output(data, channels as usize, &queue, &mut current, &mut position);
                },
                move |err| {
                    tracing::error!("Playback stream error: {}", err);
                },
                None,
            );

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(PlaybackError::OutputUnavailable(e.to_string())));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(PlaybackError::OutputUnavailable(e.to_string())));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            while running_for_loop.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(10));
            }
        })
        .map_err(|e| PlaybackError::OutputUnavailable(e.to_string()))?;

    let mut output = OutputStream {
        sample_rate,
        running,
        thread_handle: Some(handle),
    };

    match wait_stream_ready(&ready_rx, Duration::from_millis(DEVICE_OPEN_TIMEOUT_MS)) {
        StreamReady::Ready => {
            tracing::info!("Playing to {} at {} Hz ({} ch)", device_name, sample_rate, channels);
            Ok(output)
        }
        StreamReady::Failed(e) => {
            output.stop();
            Err(e)
        }
        StreamReady::TimedOut => {
            output.abandon();
            Err(PlaybackError::OutputUnavailable(format!(
                "{} did not start within {} ms",
                device_name, DEVICE_OPEN_TIMEOUT_MS
            )))
        }
        StreamReady::Exited => {
            output.stop();
            Err(PlaybackError::OutputUnavailable("playback thread exited".into()))
        }
    }
}
