//! Microphone capture pipeline
//!
//! A [`CaptureSource`] delivers fixed-size mono frames to a callback. The
//! [`CapturePipeline`] installs a callback that resamples each frame to the
//! wire rate, encodes it to PCM16 and hands the chunk to the transport, all
//! on the delivering thread. Chunks produced while the transport is not open
//! are dropped, never queued.

use bytes::Bytes;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::AudioFrame;
use crate::audio::device::{resolve_input_device, wait_stream_ready, StreamReady};
use crate::audio::resample::resample;
use crate::codec::pcm16;
use crate::constants::DEVICE_OPEN_TIMEOUT_MS;
use crate::error::AudioError;
use crate::transport::Transport;

/// Callback receiving captured frames
pub type FrameSink = Box<dyn FnMut(AudioFrame) + Send + 'static>;

/// What the pipeline asks the device for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub sample_rate: u32,
    /// Frames per delivered block
    pub block_size: usize,
}

/// A live audio input that can be opened and closed
pub trait CaptureSource: Send {
    /// Start delivering frames to `sink`. Fails with
    /// [`AudioError::CaptureUnavailable`] when the device or permission is
    /// denied.
    fn open(&mut self, request: CaptureRequest, sink: FrameSink) -> Result<Box<dyn CaptureStream>, AudioError>;
}

/// Handle to an open capture; closing unregisters the sink
pub trait CaptureStream: Send {
    /// Release the device. Must be safe to call more than once.
    fn close(&mut self);

    /// Failure reported by the device after the stream started
    fn check_error(&mut self) -> Option<AudioError> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Streaming,
}

#[derive(Default)]
struct CaptureCounters {
    frames_captured: AtomicU64,
    chunks_sent: AtomicU64,
    chunks_dropped: AtomicU64,
    bytes_sent: AtomicU64,
}

/// Capture statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub chunks_sent: u64,
    pub chunks_dropped: u64,
    pub bytes_sent: u64,
}

/// Resample a captured frame to `target_rate` and encode it for the wire
pub fn encode_frame(frame: &AudioFrame, target_rate: u32) -> Bytes {
    let resampled = resample(&frame.samples, frame.sample_rate, target_rate);
    pcm16::encode(&resampled)
}

/// Capture → resample → encode → send
pub struct CapturePipeline<S: CaptureSource> {
    source: S,
    block_size: usize,
    state: CaptureState,
    stream: Option<Box<dyn CaptureStream>>,
    /// Cleared on stop so in-flight callbacks become no-ops
    running: Arc<AtomicBool>,
    counters: Arc<CaptureCounters>,
}

impl<S: CaptureSource> CapturePipeline<S> {
    pub fn new(source: S, block_size: usize) -> Self {
        Self {
            source,
            block_size: block_size.max(1),
            state: CaptureState::Idle,
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(CaptureCounters::default()),
        }
    }

    /// Open the source and start streaming chunks to `transport`
    pub fn start(
        &mut self,
        capture_rate: u32,
        target_rate: u32,
        transport: Arc<dyn Transport>,
    ) -> Result<(), AudioError> {
        if self.state == CaptureState::Streaming {
            tracing::debug!("Capture already streaming");
            return Ok(());
        }

        // Fresh flag per run so a late callback from a previous stream can
        // never be revived by this start
        let running = Arc::new(AtomicBool::new(true));
        let counters = self.counters.clone();
        let flag = running.clone();

        let sink: FrameSink = Box::new(move |frame: AudioFrame| {
            if !flag.load(Ordering::Relaxed) {
                return;
            }
            counters.frames_captured.fetch_add(1, Ordering::Relaxed);

            if !transport.is_open() {
                counters.chunks_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Transport not open, dropping {} samples", frame.samples.len());
                return;
            }

            let chunk = encode_frame(&frame, target_rate);
            counters.chunks_sent.fetch_add(1, Ordering::Relaxed);
            counters.bytes_sent.fetch_add(chunk.len() as u64, Ordering::Relaxed);
            transport.send(chunk);
        });

        let request = CaptureRequest {
            sample_rate: capture_rate,
            block_size: self.block_size,
        };

        match self.source.open(request, sink) {
            Ok(stream) => {
                self.running = running;
                self.stream = Some(stream);
                self.state = CaptureState::Streaming;
                tracing::info!(
                    "Capture started: {} Hz -> {} Hz, {} frames/block",
                    capture_rate,
                    target_rate,
                    self.block_size
                );
                Ok(())
            }
            Err(e) => {
                running.store(false, Ordering::SeqCst);
                tracing::warn!("Capture unavailable: {}", e);
                Err(e)
            }
        }
    }

    /// Failure reported by the open stream since the last check
    pub fn check_error(&mut self) -> Option<AudioError> {
        self.stream.as_mut().and_then(|stream| stream.check_error())
    }

    /// Release the source. No-op when already idle.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(mut stream) = self.stream.take() {
            stream.close();
            tracing::info!("Capture stopped");
        }

        self.state = CaptureState::Idle;
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == CaptureState::Streaming
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.counters.frames_captured.load(Ordering::Relaxed),
            chunks_sent: self.counters.chunks_sent.load(Ordering::Relaxed),
            chunks_dropped: self.counters.chunks_dropped.load(Ordering::Relaxed),
            bytes_sent: self.counters.bytes_sent.load(Ordering::Relaxed),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: CaptureSource> Drop for CapturePipeline<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Microphone input through cpal
pub struct CpalCaptureSource {
    device_id: Option<String>,
}

impl CpalCaptureSource {
    pub fn new(device_id: Option<String>) -> Self {
        Self { device_id }
    }
}

impl CaptureSource for CpalCaptureSource {
    fn open(&mut self, request: CaptureRequest, mut sink: FrameSink) -> Result<Box<dyn CaptureStream>, AudioError> {
        let device = resolve_input_device(self.device_id.as_deref())?;
        let default_config = device.default_input_config()?;
        let channels = default_config.channels().max(1);

        let sample_rate = if device.supports_input_rate(request.sample_rate, channels) {
            request.sample_rate
        } else {
            let fallback = default_config.sample_rate().0;
            tracing::warn!(
                "{} cannot record at {} Hz, using {} Hz",
                device.name,
                request.sample_rate,
                fallback
            );
            fallback
        };

        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let running = Arc::new(AtomicBool::new(true));
        let running_for_loop = running.clone();
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);
        let (error_tx, error_rx) = bounded::<AudioError>(4);
        let block_size = request.block_size.max(1);
        let device_name = device.name.clone();

        // cpal streams are not Send on every host, so the stream lives and
        // dies on its own thread
        let handle = thread::Builder::new()
            .name("voicelink-capture".into())
            .spawn(move || {
                let cpal_device = device.into_inner();
                let mut pending: Vec<f32> = Vec::with_capacity(block_size * 2);

                let stream = cpal_device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        // Channel 0 is the mono signal
                        pending.extend(data.iter().step_by(channels as usize));
                        while pending.len() >= block_size {
                            let block: Vec<f32> = pending.drain(..block_size).collect();
                            sink(AudioFrame::mono(block, sample_rate));
                        }
                    },
                    move |err| {
                        tracing::error!("Capture stream error: {}", err);
                        let _ = error_tx.try_send(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::CaptureUnavailable(e.to_string())));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::CaptureUnavailable(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                while running_for_loop.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(10));
                }
                // Stream is dropped here, releasing the device
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        let mut stream = CpalCaptureStream {
            running,
            thread_handle: Some(handle),
            errors: error_rx,
        };

        let timeout = Duration::from_millis(DEVICE_OPEN_TIMEOUT_MS);
        match wait_stream_ready(&ready_rx, timeout) {
            StreamReady::Ready => {
                tracing::info!("Recording from {} at {} Hz ({} ch)", device_name, sample_rate, channels);
                Ok(Box::new(stream))
            }
            StreamReady::Failed(e) => {
                stream.close();
                Err(e)
            }
            StreamReady::TimedOut => {
                stream.abandon();
                Err(AudioError::CaptureUnavailable(format!(
                    "{} did not start within {} ms",
                    device_name, DEVICE_OPEN_TIMEOUT_MS
                )))
            }
            StreamReady::Exited => {
                stream.close();
                Err(AudioError::CaptureUnavailable("capture thread exited".into()))
            }
        }
    }
}

/// Open cpal input stream
pub struct CpalCaptureStream {
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    errors: Receiver<AudioError>,
}

impl CpalCaptureStream {
    /// Ask the thread to stop without waiting for it
    fn abandon(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.thread_handle.take();
    }
}

impl CaptureStream for CpalCaptureStream {
    fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    fn check_error(&mut self) -> Option<AudioError> {
        self.errors.try_recv().ok()
    }
}

impl Drop for CpalCaptureStream {
    fn drop(&mut self) {
        self.close();
    }
}
