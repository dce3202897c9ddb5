//! Queue position arithmetic.
//!
//! Navigation wraps in both directions. An unset position behaves like
//! "before the first track" for `next` and "after the last" for `previous`.

use crate::library::Track;

pub(crate) fn next_index(current: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        Some(i) => (i + 1) % len,
        None => 0,
    })
}

pub(crate) fn previous_index(current: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match current {
        Some(i) => (i % len + len - 1) % len,
        None => len - 1,
    })
}

/// Position of `track` in `queue`, matched by title and artist.
pub(crate) fn find_by_identity(queue: &[Track], track: &Track) -> Option<usize> {
    queue.iter().position(|t| t.is_same_track(track))
}
