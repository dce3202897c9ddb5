//! Application model types: `App` and `TrackSource`.
//!
//! `App` never drives playback itself. It holds the last snapshot
//! broadcast by the playback manager plus purely presentational state.

use std::sync::Arc;

use crate::library::Track;
use crate::playback::{PlaybackState, PlayerStatus};

/// Where the current track list was loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackSource {
    #[default]
    Recommendations,
    Library,
    Search(String),
}

impl TrackSource {
    pub fn label(&self) -> String {
        match self {
            TrackSource::Recommendations => "Recommendations".to_string(),
            TrackSource::Library => "My music".to_string(),
            TrackSource::Search(q) => format!("Search: {q}"),
        }
    }
}

/// Lowercase per character so match positions line up with the original.
fn lower_chars(s: &str) -> String {
    s.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

/// The main application model.
pub struct App {
    pub playback: PlaybackState,
    /// Queue index under the cursor.
    pub selected: usize,
    pub source: TrackSource,

    pub follow_playback: bool,
    pub pending_follow_index: Option<usize>,

    pub filter_mode: bool,
    pub filter_query: String,

    /// One-line message shown in the status box (errors, confirmations).
    pub status_message: Option<String>,

    lower_titles: Vec<String>,
}

impl App {
    pub fn new(playback: PlaybackState, source: TrackSource) -> Self {
        let selected = playback.current_index.unwrap_or(0);
        let lower_titles = playback.queue.iter().map(|t| lower_chars(&t.display())).collect();
        Self {
            playback,
            selected,
            source,
            follow_playback: true,
            pending_follow_index: None,
            filter_mode: false,
            filter_query: String::new(),
            status_message: None,
            lower_titles,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.playback.queue
    }

    pub fn has_tracks(&self) -> bool {
        !self.playback.queue.is_empty()
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.playback.queue.get(self.selected)
    }

    pub fn is_playing(&self) -> bool {
        self.playback.status == PlayerStatus::Playing
    }

    /// Take in a fresh snapshot. A replaced queue rebuilds the filter cache
    /// and keeps the cursor inside the visible list; follow mode moves the
    /// cursor to the current track.
    pub fn apply_state(&mut self, state: PlaybackState) {
        let queue_changed = !Arc::ptr_eq(&self.playback.queue, &state.queue);
        self.playback = state;

        if queue_changed {
            self.lower_titles = self
                .playback
                .queue
                .iter()
                .map(|t| lower_chars(&t.display()))
                .collect();
            self.pending_follow_index = None;
            self.ensure_selected_visible();
        }

        if !self.follow_playback || self.filter_mode {
            return;
        }
        let Some(idx) = self.playback.current_index else {
            return;
        };
        match self.pending_follow_index {
            Some(pending) if pending == idx => {
                self.clear_pending_follow_index();
                self.selected = idx;
            }
            Some(_) => {}
            None => self.selected = idx,
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Enable following playback (cursor follows currently playing track).
    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }
    /// Disable follow-playback and clear any pending follow index.
    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
        self.pending_follow_index = None;
    }
    /// Set an index to follow once the playback snapshot reports it.
    pub fn set_pending_follow_index(&mut self, idx: usize) {
        self.pending_follow_index = Some(idx);
    }
    pub fn clear_pending_follow_index(&mut self) {
        self.pending_follow_index = None;
    }

    /// Queue indices in display order, narrowed by the active filter.
    pub fn display_indices(&self) -> Vec<usize> {
        let all = 0..self.playback.queue.len();
        let query = self.filter_query.trim();
        if query.is_empty() {
            return all.collect();
        }
        let query_lower = lower_chars(query);
        all.filter(|&i| Self::fuzzy_match_positions_lower(&self.lower_titles[i], &query_lower).is_some())
            .collect()
    }

    /// Fuzzy-match `query_lower` against a specific track by index.
    ///
    /// Returns the character positions that match, or `None` when there is no match.
    pub fn fuzzy_match_positions_for_track(
        &self,
        track_index: usize,
        query: &str,
    ) -> Option<Vec<usize>> {
        let title = self.lower_titles.get(track_index)?;
        Self::fuzzy_match_positions_lower(title, &lower_chars(query))
    }

    /// Fuzzy/subsequence match: return the character positions in `title`
    /// that match `query`, or `None` if not matched.
    pub fn fuzzy_match_positions(title: &str, query: &str) -> Option<Vec<usize>> {
        Self::fuzzy_match_positions_lower(&lower_chars(title), &lower_chars(query))
    }

    fn fuzzy_match_positions_lower(title_lower: &str, query_lower: &str) -> Option<Vec<usize>> {
        if query_lower.is_empty() {
            return Some(Vec::new());
        }

        let mut positions: Vec<usize> = Vec::new();
        let mut title_iter = title_lower.chars().enumerate();

        for qc in query_lower.chars() {
            loop {
                match title_iter.next() {
                    Some((ti, tc)) if tc == qc => {
                        positions.push(ti);
                        break;
                    }
                    Some(_) => continue,
                    None => return None,
                }
            }
        }

        Some(positions)
    }

    /// Return the next visible index after `current`, wrapping to the first.
    pub fn next_in_view_from(&self, current: usize) -> Option<usize> {
        let display = self.display_indices();
        if display.is_empty() {
            return None;
        }

        let pos = display.iter().position(|&i| i == current);
        match pos {
            Some(p) => Some(display[(p + 1) % display.len()]),
            None => Some(display[0]),
        }
    }

    /// Return the previous visible index before `current`, wrapping to the last.
    pub fn prev_in_view_from(&self, current: usize) -> Option<usize> {
        let display = self.display_indices();
        if display.is_empty() {
            return None;
        }

        let pos = display.iter().position(|&i| i == current);
        match pos {
            Some(0) => Some(display[display.len() - 1]),
            Some(p) => Some(display[p - 1]),
            None => Some(display[display.len() - 1]),
        }
    }

    /// Set the selected track index and ensure it is visible in the display.
    pub fn set_selected(&mut self, idx: usize) {
        self.selected = idx;
        self.ensure_selected_visible();
    }

    pub fn select_first(&mut self) {
        if let Some(&first) = self.display_indices().first() {
            self.selected = first;
        }
    }

    pub fn select_last(&mut self) {
        if let Some(&last) = self.display_indices().last() {
            self.selected = last;
        }
    }

    /// Enter filter mode: enable filtering and adjust cursor behavior.
    pub fn enter_filter_mode(&mut self) {
        self.filter_mode = true;
        self.follow_playback_off();
        self.ensure_selected_visible();
    }
    pub fn exit_filter_mode(&mut self) {
        self.filter_mode = false;
    }
    /// Clear the active filter and restore selection visibility.
    pub fn clear_filter(&mut self) {
        self.filter_query.clear();
        self.filter_mode = false;
        self.ensure_selected_visible();
    }
    pub fn push_filter_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.ensure_selected_visible();
    }
    pub fn pop_filter_char(&mut self) {
        self.filter_query.pop();
        self.ensure_selected_visible();
    }

    /// Ensure that `selected` is part of the current filtered view,
    /// otherwise move selection to the first visible track.
    fn ensure_selected_visible(&mut self) {
        let display = self.display_indices();
        if display.is_empty() {
            self.selected = 0;
            return;
        }

        if !display.contains(&self.selected) {
            self.selected = display[0];
        }
    }

    /// Move selection to the next visible track.
    pub fn next(&mut self) {
        if let Some(next) = self.next_in_view_from(self.selected) {
            self.selected = next;
        }
    }

    /// Move selection to the previous visible track.
    pub fn prev(&mut self) {
        if let Some(prev) = self.prev_in_view_from(self.selected) {
            self.selected = prev;
        }
    }
}
