//! The process-wide frequency analysis node.
//!
//! One `Analyser` exists per process (see [`SharedAnalyser`]). The active
//! stream feeds it down-mixed mono samples through a [`TapWriter`]; readers
//! pull byte-scaled magnitude spectra from it once per frame. Only the
//! stream most recently passed to [`Analyser::connect`] can feed it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use thiserror::Error;

use crate::config::AnalysisSettings;
use crate::playback::StreamId;

/// Samples are handed to the shared buffer in batches of this many frames.
const WRITE_BATCH: usize = 256;

/// Reads in a row without new samples before the history counts as silence.
const STALE_READS: u32 = 3;

/// Lazily created, at-most-one analysis node.
pub type SharedAnalyser = Arc<OnceLock<Analyser>>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis state lock poisoned")]
    Poisoned,
    #[error("fft failed: {0}")]
    Fft(String),
}

struct SpectrumState {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    /// Write generation seen by the last read.
    seen: u64,
    stale_reads: u32,
}

struct Inner {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    /// Raw `StreamId` of the connected stream, 0 when detached.
    active: AtomicU64,
    /// Bumped on every accepted batch of samples.
    generation: AtomicU64,
    samples: Mutex<VecDeque<f32>>,
    spectrum: Mutex<SpectrumState>,
}

#[derive(Clone)]
pub struct Analyser {
    inner: Arc<Inner>,
}

fn blackman(n: usize) -> Vec<f32> {
    let len = n as f32;
    (0..n)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / len;
            0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
        })
        .collect()
}

impl Analyser {
    pub fn new(settings: &AnalysisSettings) -> Self {
        let fft_size = settings.fft_size;
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let input = fft.make_input_vec();
        let output = fft.make_output_vec();

        let spectrum = SpectrumState {
            fft,
            window: blackman(fft_size),
            input,
            output,
            smoothed: vec![0.0; fft_size / 2],
            seen: 0,
            stale_reads: 0,
        };

        Self {
            inner: Arc::new(Inner {
                fft_size,
                smoothing: settings.smoothing,
                min_decibels: settings.min_decibels,
                max_decibels: settings.max_decibels,
                active: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                samples: Mutex::new(VecDeque::with_capacity(fft_size)),
                spectrum: Mutex::new(spectrum),
            }),
        }
    }

    /// Get the process node, creating it on first use.
    pub fn shared(slot: &SharedAnalyser, settings: &AnalysisSettings) -> Analyser {
        slot.get_or_init(|| {
            log::debug!("creating analysis node (fft size {})", settings.fft_size);
            Analyser::new(settings)
        })
        .clone()
    }

    /// Number of magnitude bins produced per read.
    pub fn bin_count(&self) -> usize {
        self.inner.fft_size / 2
    }

    /// Make `id` the only stream feeding this node. Any previous
    /// connection is dropped together with its buffered history.
    pub fn connect(&self, id: StreamId) {
        let previous = self.inner.active.swap(id.raw(), Ordering::SeqCst);
        if previous != id.raw() {
            self.reset_history();
        }
    }

    /// Disconnect whatever stream is attached. Never fails, even when
    /// nothing is connected.
    pub fn detach(&self) {
        self.inner.active.store(0, Ordering::SeqCst);
        self.reset_history();
    }

    pub fn connected(&self) -> Option<StreamId> {
        StreamId::from_raw(self.inner.active.load(Ordering::SeqCst))
    }

    /// Writer handle for the source side of a stream.
    pub fn writer(&self, id: StreamId) -> TapWriter {
        TapWriter {
            inner: self.inner.clone(),
            id,
            pending: Vec::with_capacity(WRITE_BATCH),
        }
    }

    fn reset_history(&self) {
        if let Ok(mut samples) = self.inner.samples.lock() {
            samples.clear();
        }
        if let Ok(mut spectrum) = self.inner.spectrum.lock() {
            spectrum.smoothed.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    /// Fill `out` with the current magnitude spectrum scaled to `0..=255`.
    ///
    /// `out` should hold [`bin_count`](Self::bin_count) entries; extra
    /// entries are zeroed, missing ones are skipped.
    pub fn byte_frequency_data(&self, out: &mut [u8]) -> Result<(), AnalysisError> {
        let inner = &*self.inner;
        let n = inner.fft_size;

        let mut spectrum = inner.spectrum.lock().map_err(|_| AnalysisError::Poisoned)?;
        let state = &mut *spectrum;
        {
            let mut samples = inner.samples.lock().map_err(|_| AnalysisError::Poisoned)?;
            // A paused or starved stream stops writing; its last window must
            // not be replayed forever.
            let generation = inner.generation.load(Ordering::SeqCst);
            if generation == state.seen {
                state.stale_reads = state.stale_reads.saturating_add(1);
                if state.stale_reads >= STALE_READS {
                    samples.clear();
                }
            } else {
                state.seen = generation;
                state.stale_reads = 0;
            }
            // Left-pad with silence until a full window has been written.
            let pad = n.saturating_sub(samples.len());
            for (i, slot) in state.input.iter_mut().enumerate() {
                let s = if i < pad { 0.0 } else { samples[i - pad] };
                *slot = s * state.window[i];
            }
        }

        state
            .fft
            .process(&mut state.input, &mut state.output)
            .map_err(|e| AnalysisError::Fft(e.to_string()))?;

        let tau = inner.smoothing;
        let range = inner.max_decibels - inner.min_decibels;
        let bins = n / 2;
        for k in 0..bins {
            let magnitude = state.output[k].norm() / n as f32;
            let smoothed = tau * state.smoothed[k] + (1.0 - tau) * magnitude;
            state.smoothed[k] = smoothed;

            if let Some(slot) = out.get_mut(k) {
                *slot = if smoothed > 0.0 {
                    let db = 20.0 * smoothed.log10();
                    (255.0 * (db - inner.min_decibels) / range).floor().clamp(0.0, 255.0) as u8
                } else {
                    0
                };
            }
        }
        if out.len() > bins {
            out[bins..].iter_mut().for_each(|v| *v = 0);
        }
        Ok(())
    }
}

/// Source-side handle that feeds mono frames into the node.
///
/// Frames written by a stream that is no longer connected are discarded.
pub struct TapWriter {
    inner: Arc<Inner>,
    id: StreamId,
    pending: Vec<f32>,
}

impl TapWriter {
    pub fn push(&mut self, frame: f32) {
        self.pending.push(frame);
        if self.pending.len() >= WRITE_BATCH {
            self.flush();
        }
    }

    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if self.inner.active.load(Ordering::Relaxed) == self.id.raw() {
            if let Ok(mut samples) = self.inner.samples.lock() {
                samples.extend(self.pending.iter().copied());
                let excess = samples.len().saturating_sub(self.inner.fft_size);
                samples.drain(..excess);
                self.inner.generation.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests;
