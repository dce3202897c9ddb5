//! The single playback authority.
//!
//! `PlaybackManager` owns the queue, the current track, the active stream
//! and the volume. Every command mutates state synchronously, persists it
//! where the change matters across restarts, and notifies subscribers.
//! Stream lifecycle callbacks arrive over a channel and are applied by
//! [`PlaybackManager::pump_events`]; the runtime also calls
//! [`PlaybackManager::tick`] from its loop to drive periodic persistence.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;

use crate::analysis::{Analyser, SharedAnalyser};
use crate::config::{AnalysisSettings, Settings};
use crate::library::Track;

use super::autosave::Autosave;
use super::listeners::{Listener, Listeners, SubscriptionId};
use super::persist::{self, PersistedState, StateStore, VOLUME_BACKUP_KEY, VOLUME_KEY};
use super::queue::{find_by_identity, next_index, previous_index};
use super::stream::{AudioStream, StreamFactory, StreamRequest};
use super::types::{PlaybackState, PlayerStatus, StreamEvent, StreamEventKind, StreamId};

/// Where a stream came from. Streams rebuilt from persisted state do not
/// advance the queue when they fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum StreamOrigin {
    Command,
    Resume,
}

struct ActiveStream {
    id: StreamId,
    origin: StreamOrigin,
    handle: Box<dyn AudioStream>,
}

#[derive(Debug, Copy, Clone)]
struct Volume {
    percent: u8,
    /// Level to restore when unmuting.
    backup: Option<u8>,
}

impl Volume {
    fn gain(self) -> f32 {
        f32::from(self.percent) / 100.0
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

fn read_percent(store: &dyn StateStore, key: &str) -> Option<u8> {
    match store.get(key) {
        Ok(raw) => raw?.trim().parse::<u8>().ok().map(|v| v.min(100)),
        Err(e) => {
            log::warn!("could not read {}: {}", key, e);
            None
        }
    }
}

pub struct PlaybackManager {
    analysis_settings: AnalysisSettings,
    default_volume: u8,
    store: Box<dyn StateStore>,
    factory: Box<dyn StreamFactory>,
    analyser: SharedAnalyser,

    queue: Arc<[Track]>,
    current_index: Option<usize>,
    current_track: Option<Track>,
    status: PlayerStatus,
    /// Whether the user wants sound. While `Loading` this decides the
    /// status the stream settles in once ready.
    wants_playing: bool,
    stream: Option<ActiveStream>,
    /// Position to resume from when no stream exists.
    resume_position: Duration,
    volume: Volume,

    next_stream_id: u64,
    /// Consecutive streams that failed without ever becoming ready.
    failures: usize,
    events_tx: Sender<StreamEvent>,
    events_rx: Receiver<StreamEvent>,
    listeners: Listeners,
    autosave: Autosave,
}

impl PlaybackManager {
    /// Build the manager and restore whatever was persisted.
    ///
    /// When a current track was saved, its stream is rebuilt at the saved
    /// position and only starts playing if it was playing before.
    pub fn new(
        settings: &Settings,
        store: Box<dyn StateStore>,
        factory: Box<dyn StreamFactory>,
        analyser: SharedAnalyser,
    ) -> Self {
        let default_volume = settings.playback.default_volume.min(100);
        let volume = Volume {
            percent: read_percent(store.as_ref(), VOLUME_KEY).unwrap_or(default_volume),
            backup: read_percent(store.as_ref(), VOLUME_BACKUP_KEY),
        };
        let (events_tx, events_rx) = mpsc::channel();

        let mut manager = Self {
            analysis_settings: settings.analysis.clone(),
            default_volume,
            store,
            factory,
            analyser,
            queue: Arc::from(Vec::new()),
            current_index: None,
            current_track: None,
            status: PlayerStatus::Idle,
            wants_playing: false,
            stream: None,
            resume_position: Duration::ZERO,
            volume,
            next_stream_id: 0,
            failures: 0,
            events_tx,
            events_rx,
            listeners: Listeners::default(),
            autosave: Autosave::new(Duration::from_millis(
                settings.playback.autosave_interval_ms.max(1),
            )),
        };
        manager.restore();
        manager
    }

    fn restore(&mut self) {
        let Some(saved) = persist::load_state(self.store.as_ref()) else {
            return;
        };
        self.current_index = saved.index();
        self.queue = Arc::from(saved.tracks);
        self.current_track = saved.current_track;
        self.resume_position = secs_to_duration(saved.current_time);

        if let Some(track) = &self.current_track {
            log::info!(
                "restoring {} at {:.1}s (playing: {})",
                track.display(),
                self.resume_position.as_secs_f64(),
                saved.is_playing
            );
            self.status = PlayerStatus::Paused;
            self.open_stream(self.resume_position, saved.is_playing, StreamOrigin::Resume);
        }
    }

    // ---- queries ----------------------------------------------------------

    /// Current snapshot. The position is read live from the stream when
    /// one exists.
    pub fn state(&self) -> PlaybackState {
        let duration = self
            .stream
            .as_ref()
            .and_then(|s| s.handle.duration())
            .or_else(|| self.current_track.as_ref().and_then(Track::duration))
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        PlaybackState {
            current_track: self.current_track.clone(),
            is_playing: self.status == PlayerStatus::Playing,
            status: self.status,
            position_seconds: self.position().as_secs_f64(),
            duration_seconds: duration,
            queue: self.queue.clone(),
            current_index: self.current_index,
            volume: self.volume.percent,
        }
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn volume(&self) -> u8 {
        self.volume.percent
    }

    /// The id of the live stream, if any.
    pub fn stream_id(&self) -> Option<StreamId> {
        self.stream.as_ref().map(|s| s.id)
    }

    fn position(&self) -> Duration {
        self.stream
            .as_ref()
            .map(|s| s.handle.position())
            .unwrap_or(self.resume_position)
    }

    // ---- subscriptions ----------------------------------------------------

    pub fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        self.listeners.add(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let state = self.state();
        self.listeners.emit(&state);
    }

    // ---- queue ------------------------------------------------------------

    /// Replace the queue. The current track keeps playing; its index is
    /// re-resolved by title and artist in the new queue.
    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.queue = Arc::from(tracks);
        self.reindex();
        log::debug!(
            "queue replaced: {} tracks, current index {:?}",
            self.queue.len(),
            self.current_index
        );
        self.persist();
        self.notify();
    }

    /// Randomize queue order, keeping the current track's index consistent.
    pub fn shuffle(&mut self) {
        let mut tracks = self.queue.to_vec();
        tracks.shuffle(&mut rand::rng());
        self.set_tracks(tracks);
    }

    /// Stop playback and forget the queue and the current track.
    pub fn clear_tracks(&mut self) {
        self.dispose_stream();
        if let Some(analyser) = self.analyser.get() {
            analyser.detach();
        }
        self.queue = Arc::from(Vec::new());
        self.current_index = None;
        self.current_track = None;
        self.status = PlayerStatus::Idle;
        self.wants_playing = false;
        self.resume_position = Duration::ZERO;
        self.autosave.cancel();
        self.persist();
        self.notify();
    }

    fn reindex(&mut self) {
        self.current_index = self
            .current_track
            .as_ref()
            .and_then(|t| find_by_identity(&self.queue, t));
    }

    // ---- transport --------------------------------------------------------

    /// Make `track` current and start it from the beginning.
    ///
    /// `index` is the track's position in the queue; out-of-range values are
    /// treated as "not in the queue".
    pub fn play_track(&mut self, track: Track, index: Option<usize>) {
        self.failures = 0;
        self.start_track(track, index);
    }

    /// Play the queue entry at `index`. Out-of-range indices are ignored.
    pub fn play_index(&mut self, index: usize) {
        if let Some(track) = self.queue.get(index).cloned() {
            self.play_track(track, Some(index));
        }
    }

    pub fn toggle_play(&mut self) {
        let now = Instant::now();
        let Some(active) = self.stream.as_mut() else {
            // The stream was released; rebuild it where we left off.
            if self.current_track.is_some() {
                self.open_stream(self.resume_position, true, StreamOrigin::Resume);
                self.persist();
                self.notify();
            }
            return;
        };

        match self.status {
            PlayerStatus::Playing => {
                active.handle.pause();
                self.resume_position = active.handle.position();
                self.status = PlayerStatus::Paused;
                self.wants_playing = false;
                self.autosave.cancel();
            }
            PlayerStatus::Paused => {
                active.handle.play();
                self.status = PlayerStatus::Playing;
                self.wants_playing = true;
                self.autosave.start(now);
            }
            PlayerStatus::Loading => {
                self.wants_playing = !self.wants_playing;
                if self.wants_playing {
                    active.handle.play();
                } else {
                    active.handle.pause();
                }
            }
            PlayerStatus::Idle => return,
        }
        self.persist();
        self.notify();
    }

    pub fn next(&mut self) {
        self.failures = 0;
        self.advance(next_index);
    }

    pub fn previous(&mut self) {
        self.failures = 0;
        self.advance(previous_index);
    }

    /// Seek the current stream. Callers clamp `seconds` to the duration.
    pub fn seek(&mut self, seconds: f64) {
        let Some(active) = self.stream.as_mut() else {
            return;
        };
        let position = secs_to_duration(seconds);
        active.handle.seek(position);
        self.resume_position = position;
        self.persist();
        self.notify();
    }

    // ---- volume -----------------------------------------------------------

    pub fn set_volume(&mut self, percent: u8) {
        self.volume.percent = percent.min(100);
        if self.volume.percent > 0 {
            self.volume.backup = None;
        }
        self.apply_volume();
    }

    pub fn change_volume(&mut self, delta: i16) {
        let target = (i16::from(self.volume.percent) + delta).clamp(0, 100);
        self.set_volume(u8::try_from(target).unwrap_or(100));
    }

    pub fn toggle_mute(&mut self) {
        if self.volume.percent > 0 {
            self.volume.backup = Some(self.volume.percent);
            self.volume.percent = 0;
        } else {
            self.volume.percent = self
                .volume
                .backup
                .take()
                .filter(|&v| v > 0)
                .unwrap_or(self.default_volume.max(1));
        }
        self.apply_volume();
    }

    fn apply_volume(&mut self) {
        let gain = self.volume.gain();
        if let Some(active) = self.stream.as_mut() {
            active.handle.set_volume(gain);
        }
        let store = self.store.as_ref();
        if let Err(e) = store.set(VOLUME_KEY, &self.volume.percent.to_string()) {
            log::warn!("could not persist volume: {}", e);
        }
        let backup = match self.volume.backup {
            Some(v) => store.set(VOLUME_BACKUP_KEY, &v.to_string()),
            None => store.remove(VOLUME_BACKUP_KEY),
        };
        if let Err(e) = backup {
            log::warn!("could not persist volume backup: {}", e);
        }
        self.notify();
    }

    // ---- stream events ----------------------------------------------------

    /// Apply every stream event received so far. Returns how many were read.
    pub fn pump_events(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_stream_event(event);
            count += 1;
        }
        count
    }

    /// Run periodic work: persists the snapshot while playing.
    pub fn tick(&mut self, now: Instant) {
        if self.autosave.poll(now) && self.status == PlayerStatus::Playing {
            self.persist();
        }
    }

    pub fn handle_stream_event(&mut self, event: StreamEvent) {
        let Some(active) = self.stream.as_ref() else {
            log::debug!("ignoring {:?} with no live stream", event);
            return;
        };
        if active.id != event.id {
            log::debug!("ignoring {:?} from a replaced stream", event);
            return;
        }
        let origin = active.origin;

        match event.kind {
            StreamEventKind::Ready => {
                self.failures = 0;
                if self.wants_playing {
                    self.status = PlayerStatus::Playing;
                    self.autosave.start(Instant::now());
                } else {
                    self.status = PlayerStatus::Paused;
                    self.autosave.cancel();
                }
                self.persist();
                self.notify();
            }
            StreamEventKind::Ended => {
                log::info!("track ended");
                self.failures = 0;
                if self.queue.is_empty() {
                    self.become_idle();
                    return;
                }
                self.advance(next_index);
            }
            StreamEventKind::Failed(reason) => {
                log::warn!("stream failed: {}", reason);
                self.on_failure(origin);
            }
            StreamEventKind::Rejected(reason) => {
                log::warn!("playback refused: {}", reason);
                // Resuming reopens the stream so a refusal can surface again.
                self.resume_position = self.position();
                self.dispose_stream();
                self.wants_playing = false;
                self.status = PlayerStatus::Paused;
                self.autosave.cancel();
                self.persist();
                self.notify();
            }
        }
    }

    fn on_failure(&mut self, origin: StreamOrigin) {
        self.resume_position = match origin {
            StreamOrigin::Resume => self.resume_position,
            StreamOrigin::Command => Duration::ZERO,
        };
        self.dispose_stream();
        self.wants_playing = false;
        self.autosave.cancel();
        self.failures += 1;

        if origin == StreamOrigin::Resume {
            self.status = PlayerStatus::Paused;
            self.persist();
            self.notify();
            return;
        }
        if self.queue.is_empty() {
            self.become_idle();
            return;
        }

        self.status = PlayerStatus::Paused;
        self.persist();
        if self.failures >= self.queue.len() {
            log::error!(
                "{} consecutive tracks failed to load, stopping",
                self.failures
            );
            self.notify();
            return;
        }
        self.advance(next_index);
    }

    fn become_idle(&mut self) {
        self.dispose_stream();
        if let Some(analyser) = self.analyser.get() {
            analyser.detach();
        }
        self.current_track = None;
        self.current_index = None;
        self.status = PlayerStatus::Idle;
        self.wants_playing = false;
        self.resume_position = Duration::ZERO;
        self.autosave.cancel();
        self.persist();
        self.notify();
    }

    // ---- internals --------------------------------------------------------

    fn advance(&mut self, step: fn(Option<usize>, usize) -> Option<usize>) {
        let Some(index) = step(self.current_index, self.queue.len()) else {
            return;
        };
        let track = self.queue[index].clone();
        self.start_track(track, Some(index));
    }

    fn start_track(&mut self, track: Track, index: Option<usize>) {
        log::info!("playing {}", track.display());
        self.current_index = index.filter(|&i| i < self.queue.len());
        self.current_track = Some(track);
        self.resume_position = Duration::ZERO;
        self.open_stream(Duration::ZERO, true, StreamOrigin::Command);
        self.persist();
        self.notify();
    }

    fn allocate_stream_id(&mut self) -> StreamId {
        loop {
            self.next_stream_id = self.next_stream_id.wrapping_add(1);
            if let Some(id) = StreamId::from_raw(self.next_stream_id) {
                return id;
            }
        }
    }

    /// Replace the live stream with a fresh one for the current track.
    fn open_stream(&mut self, start_at: Duration, autoplay: bool, origin: StreamOrigin) {
        self.dispose_stream();
        let Some(url) = self.current_track.as_ref().map(|t| t.stream_url.clone()) else {
            return;
        };

        let id = self.allocate_stream_id();
        let analyser = Analyser::shared(&self.analyser, &self.analysis_settings);
        let request = StreamRequest {
            id,
            url,
            start_at,
            autoplay,
        };
        let mut handle = self
            .factory
            .open(request, self.events_tx.clone(), analyser.writer(id));
        handle.set_volume(self.volume.gain());
        analyser.connect(id);

        self.stream = Some(ActiveStream { id, origin, handle });
        self.status = PlayerStatus::Loading;
        self.wants_playing = autoplay;
        self.autosave.cancel();
    }

    fn dispose_stream(&mut self) {
        if let Some(mut active) = self.stream.take() {
            log::debug!("disposing stream {}", active.id.raw());
            active.handle.stop();
        }
    }

    fn persist(&self) {
        let is_playing = match self.status {
            PlayerStatus::Playing => true,
            PlayerStatus::Loading => self.wants_playing,
            PlayerStatus::Idle | PlayerStatus::Paused => false,
        };
        let snapshot = PersistedState {
            current_track: self.current_track.clone(),
            is_playing,
            current_time: self.position().as_secs_f64(),
            tracks: self.queue.to_vec(),
            current_index: PersistedState::encode_index(self.current_index),
        };
        persist::save_state(self.store.as_ref(), &snapshot);
    }
}

impl Drop for PlaybackManager {
    fn drop(&mut self) {
        self.dispose_stream();
    }
}
