//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`. The
//! animated gradient field is painted first, one half-block per pair of
//! canvas rows; every other widget is drawn on top of it.

use std::{collections::BTreeMap, sync::LazyLock};

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, LineGauge, List, ListItem, ListState, Padding, Paragraph, Widget, Wrap},
};

use crate::app::App;
use crate::config::UiSettings;
use crate::playback::PlayerStatus;
use crate::visual::Canvas;

static CONTROLS_MAP: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    map.insert("j/k".to_string(), "up/down".to_string());
    map.insert("gg/G".to_string(), "top/bottom".to_string());
    map.insert("enter".to_string(), "play selected".to_string());
    map.insert("space/p".to_string(), "play/pause".to_string());
    map.insert("h/l".to_string(), "prev/next".to_string());
    // H/L is filled dynamically from config.
    map.insert("/".to_string(), "filter".to_string());
    map.insert("s".to_string(), "shuffle".to_string());
    map.insert("+/-".to_string(), "volume".to_string());
    map.insert("m".to_string(), "mute".to_string());
    map.insert("a/d".to_string(), "add/remove in library".to_string());
    map.insert("c".to_string(), "clear queue".to_string());
    map.insert("q".to_string(), "quit".to_string());
    map
});

/// Render the controls help text, incorporating scrub seconds.
pub(crate) fn controls_text(scrub_seconds: u64) -> String {
    let order = [
        "j/k", "h/l", "H/L", "enter", "space/p", "gg/G", "/", "s", "+/-", "m", "a/d", "c", "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] scrub -/+{}s", scrub_seconds))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format seconds as `m:ss`, or `h:mm:ss` past an hour.
pub(crate) fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Paints a [`Canvas`] with `▀` cells: foreground is the upper pixel,
/// background the lower one.
pub struct MeshBackground<'a> {
    canvas: &'a Canvas,
}

impl<'a> MeshBackground<'a> {
    pub fn new(canvas: &'a Canvas) -> Self {
        Self { canvas }
    }
}

impl Widget for MeshBackground<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height {
            let y = usize::from(row) * 2;
            for col in 0..area.width {
                let x = usize::from(col);
                let (Some(top), Some(bottom)) = (self.canvas.rgb_at(x, y), self.canvas.rgb_at(x, y + 1))
                else {
                    continue;
                };
                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_symbol("▀")
                        .set_fg(Color::Rgb(top.r, top.g, top.b))
                        .set_bg(Color::Rgb(bottom.r, bottom.g, bottom.b));
                }
            }
        }
    }
}

fn status_label(status: PlayerStatus) -> &'static str {
    match status {
        PlayerStatus::Idle => "Stopped",
        PlayerStatus::Loading => "Loading",
        PlayerStatus::Playing => "Playing",
        PlayerStatus::Paused => "Paused",
    }
}

fn padded_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        })
}

/// Render the entire UI into the provided `frame`.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    display: &[usize],
    background: Option<&Canvas>,
    ui_settings: &UiSettings,
) {
    if let Some(canvas) = background {
        frame.render_widget(MeshBackground::new(canvas), frame.area());
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
            Constraint::Length(4),
        ])
        .split(frame.area());

    draw_header(frame, app, ui_settings, chunks[0]);
    draw_track_list(frame, app, display, chunks[1]);
    draw_player(frame, app, chunks[2]);

    let footer = Paragraph::new(controls_text(ui_settings.scrub_seconds))
        .block(padded_block(" controls ".to_string()))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}

fn draw_header(frame: &mut Frame, app: &App, ui_settings: &UiSettings, area: Rect) {
    let (text, style) = match &app.status_message {
        Some(msg) => (msg.as_str(), Style::default().add_modifier(Modifier::BOLD)),
        None => (ui_settings.header_text.as_str(), Style::default()),
    };
    let header = Paragraph::new(text)
        .style(style)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", app.source.label()))
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, area);
}

fn draw_track_list(frame: &mut Frame, app: &App, display: &[usize], area: Rect) {
    let q = app.filter_query.trim();
    let tracks = app.tracks();

    // Only build ListItems for the visible window, centred on the cursor.
    let total = display.len();
    let list_height = area.height.saturating_sub(2) as usize;
    let sel_pos = display.iter().position(|&i| i == app.selected).unwrap_or(0);
    let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
        (0, total, sel_pos)
    } else {
        let half = list_height / 2;
        let mut start = sel_pos.saturating_sub(half);
        if start + list_height > total {
            start = total - list_height;
        }
        (start, start + list_height, sel_pos - start)
    };

    let visible_items: Vec<ListItem> = display[start..end]
        .iter()
        .map(|&i| {
            let track = &tracks[i];
            let marker = if app.playback.current_index == Some(i) {
                "♪ "
            } else {
                "  "
            };
            let title = track.display();
            let mut rendered = String::from(marker);
            match (!q.is_empty())
                .then(|| app.fuzzy_match_positions_for_track(i, q))
                .flatten()
            {
                Some(positions) => {
                    let mut pos_iter = positions.into_iter();
                    let mut next_pos = pos_iter.next();
                    for (ci, ch) in title.chars().enumerate() {
                        if next_pos == Some(ci) {
                            rendered.extend(ch.to_uppercase());
                            next_pos = pos_iter.next();
                        } else {
                            rendered.push(ch);
                        }
                    }
                }
                None => rendered.push_str(&title),
            }
            ListItem::new(Line::from(vec![
                Span::raw(rendered),
                Span::raw("  "),
                Span::styled(
                    format_time(track.duration_seconds),
                    Style::default().add_modifier(Modifier::DIM),
                ),
            ]))
        })
        .collect();

    let mut title = format!(" tracks ({}) ", tracks.len());
    if app.filter_mode || !q.is_empty() {
        title = format!(" tracks ({}/{}) filter: {} ", total, tracks.len(), q);
    }
    let list = List::new(visible_items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if total > 0 {
        state.select(Some(selected_pos_in_visible));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_player(frame: &mut Frame, app: &App, area: Rect) {
    let state = &app.playback;
    let volume = if state.is_muted() {
        "muted".to_string()
    } else {
        format!("vol {}%", state.volume)
    };
    let block = padded_block(format!(
        " {} • {} ",
        status_label(state.status),
        volume
    ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let Some(track) = &state.current_track else {
        frame.render_widget(Paragraph::new("Nothing playing"), rows[0]);
        return;
    };

    let icon = match state.status {
        PlayerStatus::Playing => "▶",
        PlayerStatus::Loading => "…",
        _ => "⏸",
    };
    let now_playing = Line::from(vec![
        Span::raw(format!("{icon} ")),
        Span::styled(track.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" - "),
        Span::raw(track.artist.clone()),
    ]);
    frame.render_widget(Paragraph::new(now_playing), rows[0]);

    let ratio = if state.duration_seconds > 0.0 {
        (state.position_seconds / state.duration_seconds).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let gauge = LineGauge::default()
        .filled_style(Style::default().add_modifier(Modifier::BOLD))
        .label(format!(
            "{} / {}",
            format_time(state.position_seconds),
            format_time(state.duration_seconds)
        ))
        .ratio(ratio);
    frame.render_widget(gauge, rows[1]);
}

#[cfg(test)]
mod tests;
