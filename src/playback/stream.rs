//! The seam between the playback core and the audio backend.
//!
//! A stream is bound to one URL and is never reused: every track change
//! opens a fresh one. Lifecycle callbacks arrive asynchronously as
//! [`StreamEvent`]s tagged with the stream's id.

use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::analysis::TapWriter;

use super::types::{StreamEvent, StreamId};

#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub id: StreamId,
    pub url: String,
    /// Initial position.
    pub start_at: Duration,
    /// Start playing as soon as the stream is ready.
    pub autoplay: bool,
}

pub trait AudioStream {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: Duration);
    /// Linear gain, 0.0 to 1.0.
    fn set_volume(&mut self, volume: f32);
    fn position(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;
    /// Stop and release the stream. No events are expected afterwards, and
    /// any that still arrive are ignored by id.
    fn stop(&mut self);
}

pub trait StreamFactory {
    fn open(
        &mut self,
        request: StreamRequest,
        events: Sender<StreamEvent>,
        tap: TapWriter,
    ) -> Box<dyn AudioStream>;
}
