//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and mirrors the latest playback
//! snapshot together with the cursor, filter and status line.

mod model;

pub use model::*;
