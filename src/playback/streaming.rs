//! Per-chunk playback
//!
//! Each chunk is decoded on arrival and submitted as its own unit. Timing is
//! left to the engine, which plays units in submission order without gaps.

use bytes::Bytes;
use std::sync::Arc;

use crate::audio::buffer::AudioFrame;
use crate::codec::pcm16;
use crate::config::PlaybackMode;
use crate::constants::TARGET_SAMPLE_RATE;
use crate::error::{Error, PlaybackError};
use crate::playback::{PlayOutcome, PlaybackEngine, PlaybackReconstructor, ReconstructorStats};

pub struct StreamingReconstructor {
    engine: Arc<dyn PlaybackEngine>,
    sample_rate: u32,
    stats: ReconstructorStats,
}

impl StreamingReconstructor {
    pub fn new(engine: Arc<dyn PlaybackEngine>) -> Self {
        Self::with_sample_rate(engine, TARGET_SAMPLE_RATE)
    }

    pub fn with_sample_rate(engine: Arc<dyn PlaybackEngine>, sample_rate: u32) -> Self {
        Self {
            engine,
            sample_rate,
            stats: ReconstructorStats::default(),
        }
    }
}

impl PlaybackReconstructor for StreamingReconstructor {
    fn mode(&self) -> PlaybackMode {
        PlaybackMode::Streaming
    }

    fn on_chunk(&mut self, chunk: Bytes) -> Result<(), Error> {
        self.stats.chunks_received += 1;
        self.stats.bytes_received += chunk.len() as u64;

        let samples = match pcm16::decode(&chunk) {
            Ok(samples) => samples,
            Err(e) => {
                self.stats.malformed += 1;
                tracing::warn!("Skipping chunk: {}", e);
                return Err(e.into());
            }
        };
        if samples.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.engine.play_unit(AudioFrame::mono(samples, self.sample_rate)) {
            self.stats.rejected += 1;
            tracing::warn!("Engine refused chunk of {} bytes: {}", chunk.len(), e);
            return Err(e.into());
        }

        self.stats.submitted += 1;
        tracing::debug!("Playing audio chunk ({} bytes)", chunk.len());
        Ok(())
    }

    fn play(&mut self) -> Result<PlayOutcome, PlaybackError> {
        Ok(PlayOutcome::Streaming)
    }

    fn reset(&mut self) {}

    fn release(&mut self) {
        self.engine.release();
    }

    fn stats(&self) -> ReconstructorStats {
        self.stats
    }
}
