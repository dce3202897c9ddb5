//! `StreamFactory` backed by `rodio`.
//!
//! Each stream downloads its URL into memory on a loader thread, decodes it
//! and appends it to a fresh `Sink` on the shared output mixer. Controls
//! issued before the sink exists are recorded and applied once it does.
//! Decoded samples pass through [`TapSource`], which feeds the analysis tap
//! and reports the end of the track.

use std::io::{self, Cursor, Read};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use rodio::decoder::DecoderError;
use rodio::mixer::Mixer;
use rodio::source::SeekError;
use rodio::{
    ChannelCount, Decoder, OutputStream, OutputStreamBuilder, Sample, SampleRate, Sink, Source,
};

use thiserror::Error;

use crate::analysis::TapWriter;
use crate::config::ApiSettings;

use super::stream::{AudioStream, StreamFactory, StreamRequest};
use super::types::{StreamEvent, StreamEventKind, StreamId};

/// Upper bound on a downloaded track.
const MAX_TRACK_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("download failed: {0}")]
    Download(#[from] io::Error),
    #[error("decode failed: {0}")]
    Decode(#[from] DecoderError),
}

pub struct RodioStreamFactory {
    /// `None` when no output device could be opened; every stream is then
    /// rejected.
    output: Option<OutputStream>,
    agent: ureq::Agent,
}

impl RodioStreamFactory {
    pub fn open_default(settings: &ApiSettings) -> Self {
        let output = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                // rodio logs to stderr when the OutputStream is dropped, which
                // tears through the TUI.
                stream.log_on_drop(false);
                Some(stream)
            }
            Err(e) => {
                log::error!("no audio output device: {}", e);
                None
            }
        };
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(settings.timeout_secs))
            .user_agent(&settings.user_agent)
            .build();
        Self { output, agent }
    }
}

impl StreamFactory for RodioStreamFactory {
    fn open(
        &mut self,
        request: StreamRequest,
        events: Sender<StreamEvent>,
        tap: TapWriter,
    ) -> Box<dyn AudioStream> {
        let shared = Arc::new(Mutex::new(Controls {
            sink: None,
            playing: request.autoplay,
            offset: request.start_at,
            volume: 1.0,
            duration: None,
            stopped: false,
        }));

        match &self.output {
            Some(output) => {
                let loader = Loader {
                    request,
                    mixer: output.mixer().clone(),
                    agent: self.agent.clone(),
                    shared: shared.clone(),
                    events,
                    tap,
                };
                thread::spawn(move || loader.run());
            }
            None => {
                let _ = events.send(StreamEvent::new(
                    request.id,
                    StreamEventKind::Rejected("no audio output device".to_string()),
                ));
            }
        }

        Box::new(RodioStream { shared })
    }
}

struct Controls {
    sink: Option<Sink>,
    playing: bool,
    /// Position of the sink's zero. Cleared by the first seek on the sink,
    /// which resets its own position counter.
    offset: Duration,
    volume: f32,
    duration: Option<Duration>,
    stopped: bool,
}

fn lock(shared: &Mutex<Controls>) -> MutexGuard<'_, Controls> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct RodioStream {
    shared: Arc<Mutex<Controls>>,
}

impl AudioStream for RodioStream {
    fn play(&mut self) {
        let mut c = lock(&self.shared);
        c.playing = true;
        if let Some(sink) = &c.sink {
            sink.play();
        }
    }

    fn pause(&mut self) {
        let mut c = lock(&self.shared);
        c.playing = false;
        if let Some(sink) = &c.sink {
            sink.pause();
        }
    }

    fn seek(&mut self, position: Duration) {
        let mut c = lock(&self.shared);
        let Some(sink) = &c.sink else {
            c.offset = position;
            return;
        };
        match sink.try_seek(position) {
            Ok(()) => c.offset = Duration::ZERO,
            Err(e) => log::warn!("seek to {:.1}s failed: {}", position.as_secs_f64(), e),
        }
    }

    fn set_volume(&mut self, volume: f32) {
        let mut c = lock(&self.shared);
        c.volume = volume;
        if let Some(sink) = &c.sink {
            sink.set_volume(volume);
        }
    }

    fn position(&self) -> Duration {
        let c = lock(&self.shared);
        c.offset + c.sink.as_ref().map_or(Duration::ZERO, Sink::get_pos)
    }

    fn duration(&self) -> Option<Duration> {
        lock(&self.shared).duration
    }

    fn stop(&mut self) {
        let mut c = lock(&self.shared);
        c.stopped = true;
        if let Some(sink) = c.sink.take() {
            sink.stop();
        }
    }
}

impl Drop for RodioStream {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Loader {
    request: StreamRequest,
    mixer: Mixer,
    agent: ureq::Agent,
    shared: Arc<Mutex<Controls>>,
    events: Sender<StreamEvent>,
    tap: TapWriter,
}

impl Loader {
    fn run(self) {
        let id = self.request.id;
        let mut decoder = match self.fetch_and_decode() {
            Ok(Some(decoder)) => decoder,
            Ok(None) => return,
            Err(e) => {
                self.send(StreamEventKind::Failed(e.to_string()));
                return;
            }
        };

        let mut c = lock(&self.shared);
        if c.stopped {
            return;
        }
        if !c.offset.is_zero() {
            match decoder.try_seek(c.offset) {
                Ok(()) => {}
                Err(e) => {
                    log::warn!("could not resume at {:.1}s: {}", c.offset.as_secs_f64(), e);
                    c.offset = Duration::ZERO;
                }
            }
        }
        c.duration = decoder.total_duration();

        let sink = Sink::connect_new(&self.mixer);
        sink.set_volume(c.volume);
        if !c.playing {
            sink.pause();
        }
        sink.append(TapSource::new(decoder, self.tap, id, self.events.clone()));
        c.sink = Some(sink);
        drop(c);

        let _ = self.events.send(StreamEvent::new(id, StreamEventKind::Ready));
    }

    /// `Ok(None)` when the stream was stopped while downloading.
    fn fetch_and_decode(&self) -> Result<Option<Decoder<Cursor<Vec<u8>>>>, StreamError> {
        let response = self
            .agent
            .get(&self.request.url)
            .call()
            .map_err(|e| StreamError::Fetch(e.to_string()))?;
        let bytes = read_capped(response.into_reader(), MAX_TRACK_BYTES)?;
        if lock(&self.shared).stopped {
            return Ok(None);
        }
        Ok(Some(Decoder::new(Cursor::new(bytes))?))
    }

    fn send(&self, kind: StreamEventKind) {
        let _ = self.events.send(StreamEvent::new(self.request.id, kind));
    }
}

/// Read the whole body, refusing anything longer than `limit` bytes.
pub(super) fn read_capped(reader: impl Read, limit: u64) -> Result<Vec<u8>, StreamError> {
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Err(StreamError::Fetch("track exceeds size limit".to_string()));
    }
    Ok(bytes)
}

/// Pass-through source that down-mixes every frame into the analysis tap
/// and emits `Ended` once the inner source is exhausted.
pub struct TapSource<S> {
    inner: S,
    tap: TapWriter,
    id: StreamId,
    events: Sender<StreamEvent>,
    channels: ChannelCount,
    frame_pos: ChannelCount,
    frame_sum: f32,
    ended: bool,
}

impl<S: Source> TapSource<S> {
    pub fn new(inner: S, tap: TapWriter, id: StreamId, events: Sender<StreamEvent>) -> Self {
        let channels = inner.channels().max(1);
        Self {
            inner,
            tap,
            id,
            events,
            channels,
            frame_pos: 0,
            frame_sum: 0.0,
            ended: false,
        }
    }
}

impl<S: Source> Iterator for TapSource<S> {
    type Item = Sample;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(sample) = self.inner.next() else {
            if !self.ended {
                self.ended = true;
                self.tap.flush();
                let _ = self
                    .events
                    .send(StreamEvent::new(self.id, StreamEventKind::Ended));
            }
            return None;
        };

        if self.frame_pos == 0 {
            self.channels = self.inner.channels().max(1);
        }
        self.frame_sum += sample;
        self.frame_pos += 1;
        if self.frame_pos >= self.channels {
            self.tap.push(self.frame_sum / f32::from(self.channels));
            self.frame_pos = 0;
            self.frame_sum = 0.0;
        }
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S: Source> Source for TapSource<S> {
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> ChannelCount {
        self.inner.channels()
    }

    fn sample_rate(&self) -> SampleRate {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        self.tap.flush();
        self.frame_pos = 0;
        self.frame_sum = 0.0;
        self.inner.try_seek(pos)
    }
}
