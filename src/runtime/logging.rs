use std::fs::{self, OpenOptions};
use std::path::Path;

const LOG_FILE: &str = "resonance.log";

/// Route `log` output to `<state_dir>/resonance.log`; the terminal belongs
/// to the TUI. Without a state directory logging stays disabled.
pub fn init(state_dir: Option<&Path>) {
    let Some(dir) = state_dir else {
        return;
    };
    if fs::create_dir_all(dir).is_err() {
        return;
    }
    let file = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))
    {
        Ok(f) => f,
        Err(_) => return,
    };

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init();
}
