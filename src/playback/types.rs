//! Playback-related small types: stream identity, stream lifecycle events
//! and the state snapshot shared with every UI surface.

use std::num::NonZeroU64;
use std::sync::Arc;

use crate::library::Track;

/// Generation number of a stream. Every constructed stream gets a fresh id,
/// so callbacks from a replaced stream can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(NonZeroU64);

impl StreamId {
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEventKind {
    /// The stream is constructed and, if requested, playing.
    Ready,
    /// The source ran out of samples.
    Ended,
    /// Fetching or decoding failed.
    Failed(String),
    /// The stream exists but playback could not be started.
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub id: StreamId,
    pub kind: StreamEventKind,
}

impl StreamEvent {
    pub fn new(id: StreamId, kind: StreamEventKind) -> Self {
        Self { id, kind }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    /// No current track.
    #[default]
    Idle,
    /// A stream is being constructed.
    Loading,
    Playing,
    Paused,
}

/// Immutable snapshot of the process-wide playback state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub status: PlayerStatus,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    pub queue: Arc<[Track]>,
    /// `None` when nothing in the queue is current.
    pub current_index: Option<usize>,
    /// Volume percentage, 0-100.
    pub volume: u8,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_track: None,
            is_playing: false,
            status: PlayerStatus::Idle,
            position_seconds: 0.0,
            duration_seconds: 0.0,
            queue: Arc::from(Vec::new()),
            current_index: None,
            volume: 100,
        }
    }
}

impl PlaybackState {
    pub fn is_muted(&self) -> bool {
        self.volume == 0
    }
}
