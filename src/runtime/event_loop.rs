use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::config;
use crate::library::LibraryApi;
use crate::playback::{PlaybackManager, PlaybackState, PlayerStatus};
use crate::runtime::startup::{Session, edit_library};
use crate::ui;
use crate::visual::MeshVisualizer;

/// Collaborators the key handlers need besides the model.
pub struct Services<'a> {
    pub settings: &'a config::Settings,
    pub api: &'a dyn LibraryApi,
    pub session: &'a Session,
}

/// State tracked by the runtime event loop across iterations.
#[derive(Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
}

/// Main terminal event loop: drains playback events, redraws the
/// background and the UI, and handles input. Returns `Ok(())` when shutdown
/// is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    services: &Services<'_>,
    app: &mut App,
    manager: &mut PlaybackManager,
    visualizer: &mut Option<MeshVisualizer>,
    state_rx: &Receiver<PlaybackState>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame_interval = Duration::from_millis(services.settings.visual.frame_interval_ms.max(1));
    if let Some(vis) = visualizer.as_mut() {
        sync_visualizer(vis, &app.playback, Instant::now());
    }

    loop {
        let now = Instant::now();
        manager.pump_events();
        manager.tick(now);

        // Snapshots broadcast by the manager; the visualizer follows the
        // current track.
        while let Ok(snapshot) = state_rx.try_recv() {
            app.apply_state(snapshot);
            if let Some(vis) = visualizer.as_mut() {
                sync_visualizer(vis, &app.playback, now);
            }
        }
        // Position advances without broadcasts.
        let live = manager.state();
        app.playback.position_seconds = live.position_seconds;
        app.playback.duration_seconds = live.duration_seconds;

        if let Some(vis) = visualizer.as_mut() {
            let size = terminal.size()?;
            vis.resize(usize::from(size.width), usize::from(size.height) * 2);
            vis.frame(now);
        }

        let display = app.display_indices();
        let background = visualizer
            .as_ref()
            .filter(|v| v.is_running())
            .map(|v| v.canvas());
        terminal.draw(|f| ui::draw(f, app, &display, background, &services.settings.ui))?;

        if event::poll(frame_interval)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, services, app, manager, state) {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Start the field for the current track, or stop it when nothing is
/// current. Restarting the same track keeps the running field.
fn sync_visualizer(vis: &mut MeshVisualizer, playback: &PlaybackState, now: Instant) {
    match &playback.current_track {
        Some(track) if playback.status != PlayerStatus::Idle => {
            vis.start(&track.title, &track.artist, now);
        }
        _ => {
            if vis.is_running() {
                vis.stop();
            }
        }
    }
}

fn play_selected(app: &mut App, manager: &mut PlaybackManager) {
    app.follow_playback_on();
    app.set_pending_follow_index(app.selected);
    manager.play_index(app.selected);
}

fn scrub(manager: &mut PlaybackManager, seconds: f64) {
    let state = manager.state();
    if state.current_track.is_none() {
        return;
    }
    let mut target = (state.position_seconds + seconds).max(0.0);
    if state.duration_seconds > 0.0 {
        target = target.min(state.duration_seconds);
    }
    manager.seek(target);
}

/// Returns `true` when the user asked to quit.
fn handle_key_event(
    key: KeyEvent,
    services: &Services<'_>,
    app: &mut App,
    manager: &mut PlaybackManager,
    state: &mut EventLoopState,
) -> bool {
    if app.filter_mode {
        state.pending_gg = false;
        match key.code {
            KeyCode::Esc => app.clear_filter(),
            KeyCode::Backspace => app.pop_filter_char(),
            KeyCode::Char('j') | KeyCode::Char('n')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                app.follow_playback_off();
                app.next();
            }
            KeyCode::Char('k') | KeyCode::Char('p')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                app.follow_playback_off();
                app.prev();
            }
            KeyCode::Char(c) => {
                if !c.is_control() {
                    app.push_filter_char(c);
                }
            }
            KeyCode::Enter => {
                if !app.display_indices().is_empty() {
                    app.exit_filter_mode();
                    play_selected(app, manager);
                }
            }
            _ => {}
        }
        return false;
    }

    // g pending should clear on anything but a second g.
    if key.code != KeyCode::Char('g') {
        state.pending_gg = false;
    }

    let settings = services.settings;
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Esc => app.clear_status(),
        KeyCode::Char('/') => app.enter_filter_mode(),
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.follow_playback_off();
                app.select_first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => {
            app.follow_playback_off();
            app.select_last();
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Enter => {
            let already_playing =
                app.is_playing() && app.playback.current_index == Some(app.selected);
            if app.selected_track().is_some() && !already_playing {
                play_selected(app, manager);
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            app.follow_playback_on();
            if manager.current_track().is_none() {
                if app.has_tracks() {
                    play_selected(app, manager);
                }
            } else {
                manager.toggle_play();
            }
        }
        KeyCode::Char('l') => {
            app.follow_playback_on();
            manager.next();
        }
        KeyCode::Char('h') => {
            app.follow_playback_on();
            manager.previous();
        }
        KeyCode::Char('L') => scrub(manager, settings.ui.scrub_seconds as f64),
        KeyCode::Char('H') => scrub(manager, -(settings.ui.scrub_seconds as f64)),
        KeyCode::Char('s') => {
            manager.shuffle();
            app.apply_state(manager.state());
            if app.playback.current_index.is_none() {
                app.select_first();
            }
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            manager.change_volume(i16::from(settings.playback.volume_step));
        }
        KeyCode::Char('-') => {
            manager.change_volume(-i16::from(settings.playback.volume_step));
        }
        KeyCode::Char('m') => manager.toggle_mute(),
        KeyCode::Char('a') | KeyCode::Char('d') => {
            let add = key.code == KeyCode::Char('a');
            let message = edit_library(services.api, services.session, manager.current_track(), add);
            app.set_status(message);
        }
        KeyCode::Char('c') => {
            manager.clear_tracks();
            app.set_status("Queue cleared");
        }
        _ => {}
    }

    false
}
