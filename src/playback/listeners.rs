use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::types::PlaybackState;

pub type Listener = Box<dyn Fn(&PlaybackState)>;

/// Handle returned by `subscribe`; pass it to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub(super) struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener)>,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

impl Listeners {
    pub(super) fn add(&mut self, listener: Listener) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push((id, listener));
        id
    }

    pub(super) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(super) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver `state` to every listener. A panicking listener is logged and
    /// does not stop delivery to the others.
    pub(super) fn emit(&self, state: &PlaybackState) {
        for (id, listener) in &self.entries {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(state))) {
                log::error!(
                    "state listener {:?} panicked: {}",
                    id,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}
