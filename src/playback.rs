//! Playback core: queue, transport, persistence and the audio backend seam.

mod autosave;
mod listeners;
mod manager;
mod persist;
mod queue;
mod rodio_backend;
mod stream;
mod types;

pub use listeners::{Listener, SubscriptionId};
pub use manager::PlaybackManager;
pub use persist::{JsonFileStore, MemoryStore, PersistedState, StateStore, StoreError};
pub use rodio_backend::{RodioStreamFactory, StreamError};
pub use stream::{AudioStream, StreamFactory, StreamRequest};
pub use types::{PlaybackState, PlayerStatus, StreamEvent, StreamEventKind, StreamId};
