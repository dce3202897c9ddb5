use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A playable item obtained from the remote library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub duration_seconds: f64,
    /// Remote, time-limited stream location.
    pub stream_url: String,
    #[serde(default)]
    pub cover_art_url: Option<String>,
    /// Present only for tracks resolvable against the remote library.
    #[serde(default)]
    pub remote_id: Option<i64>,
    #[serde(default)]
    pub owner_id: Option<i64>,
}

impl Track {
    /// `(title, artist)`: the identity used to re-find a track in a replaced queue.
    pub fn identity(&self) -> (&str, &str) {
        (&self.title, &self.artist)
    }

    pub fn is_same_track(&self, other: &Track) -> bool {
        self.identity() == other.identity()
    }

    pub fn duration(&self) -> Option<Duration> {
        (self.duration_seconds.is_finite() && self.duration_seconds > 0.0)
            .then(|| Duration::from_secs_f64(self.duration_seconds))
    }

    /// Remote ids needed by add/remove operations, if this track has them.
    pub fn library_ref(&self) -> Option<(i64, i64)> {
        Some((self.owner_id?, self.remote_id?))
    }

    pub fn display(&self) -> String {
        let artist = self.artist.trim();
        if artist.is_empty() {
            self.title.trim().to_string()
        } else {
            format!("{} - {}", artist, self.title.trim())
        }
    }
}
