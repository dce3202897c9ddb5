use std::sync::Arc;

use ratatui::{Terminal, backend::TestBackend, buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

use super::*;
use crate::app::TrackSource;
use crate::library::Track;
use crate::playback::PlaybackState;
use crate::visual::{GradientStops, Rgb};

fn track(title: &str, artist: &str, duration_seconds: f64) -> Track {
    Track {
        title: title.into(),
        artist: artist.into(),
        duration_seconds,
        stream_url: format!("https://cdn.example/{title}"),
        cover_art_url: None,
        remote_id: None,
        owner_id: None,
    }
}

fn buffer_text(buffer: &Buffer) -> String {
    buffer.content().iter().map(|c| c.symbol()).collect()
}

fn render(app: &App, canvas: Option<&Canvas>) -> Buffer {
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let display = app.display_indices();
    terminal
        .draw(|f| draw(f, app, &display, canvas, &UiSettings::default()))
        .unwrap();
    terminal.backend().buffer().clone()
}

#[test]
fn format_time_minutes_and_hours() {
    assert_eq!(format_time(0.0), "0:00");
    assert_eq!(format_time(65.9), "1:05");
    assert_eq!(format_time(3725.0), "1:02:05");
    assert_eq!(format_time(-3.0), "0:00");
    assert_eq!(format_time(f64::NAN), "0:00");
}

#[test]
fn controls_text_includes_scrub_seconds() {
    let text = controls_text(7);
    assert!(text.contains("[H/L] scrub -/+7s"));
    assert!(text.starts_with("[j/k] up/down"));
    assert!(text.ends_with("[q] quit"));
}

#[test]
fn background_paints_half_blocks() {
    let mut canvas = Canvas::new(4, 4);
    canvas.add_radial_gradient(
        2.5,
        0.5,
        1.5,
        Rgb { r: 255, g: 0, b: 0 },
        GradientStops {
            center: 1.0,
            middle: 1.0,
        },
    );
    let area = Rect::new(0, 0, 4, 2);
    let mut buf = Buffer::empty(area);
    MeshBackground::new(&canvas).render(area, &mut buf);

    let lit = &buf[(2, 0)];
    assert_eq!(lit.symbol(), "▀");
    assert_eq!(lit.fg, Color::Rgb(255, 0, 0));

    let dark = &buf[(0, 1)];
    assert_eq!(dark.fg, Color::Rgb(0, 0, 0));
    assert_eq!(dark.bg, Color::Rgb(0, 0, 0));
}

#[test]
fn background_skips_cells_beyond_canvas() {
    let canvas = Canvas::new(2, 2);
    let area = Rect::new(0, 0, 3, 2);
    let mut buf = Buffer::empty(area);
    MeshBackground::new(&canvas).render(area, &mut buf);

    assert_eq!(buf[(0, 0)].symbol(), "▀");
    assert_eq!(buf[(2, 0)].symbol(), " ");
    assert_eq!(buf[(0, 1)].symbol(), " ");
}

#[test]
fn draw_shows_idle_player() {
    let app = App::new(PlaybackState::default(), TrackSource::Library);
    let text = buffer_text(&render(&app, None));
    assert!(text.contains("Nothing playing"));
    assert!(text.contains("My music"));
    assert!(text.contains("tracks (0)"));
}

#[test]
fn draw_shows_current_track_and_progress() {
    let tracks = vec![track("Song", "Band", 200.0), track("Other", "Band", 90.0)];
    let state = PlaybackState {
        current_track: Some(tracks[0].clone()),
        is_playing: true,
        status: PlayerStatus::Playing,
        position_seconds: 65.0,
        duration_seconds: 200.0,
        queue: Arc::from(tracks),
        current_index: Some(0),
        volume: 40,
    };
    let app = App::new(state, TrackSource::default());
    let canvas = Canvas::new(80, 48);
    let text = buffer_text(&render(&app, Some(&canvas)));
    assert!(text.contains("1:05 / 3:20"));
    assert!(text.contains("Playing"));
    assert!(text.contains("vol 40%"));
    assert!(text.contains("Band - Other"));
}

#[test]
fn draw_prefers_status_message_over_header() {
    let mut app = App::new(PlaybackState::default(), TrackSource::default());
    app.set_status("Added to library");
    let text = buffer_text(&render(&app, None));
    assert!(text.contains("Added to library"));
}
