//! The animation driver for the spectral background.

use std::f64::consts::PI;
use std::time::{Duration, Instant};

use crate::analysis::{Analyser, SharedAnalyser};
use crate::config::VisualSettings;

use super::canvas::{Canvas, GradientStops};
use super::energy::BandEnergy;
use super::palette::{PointField, derive_palette};

const POSITION_SMOOTHING: f64 = 0.05;
const SIZE_SMOOTHING: f64 = 0.15;

pub struct MeshVisualizer {
    settings: VisualSettings,
    slot: SharedAnalyser,
    analyser: Option<Analyser>,
    spectrum: Vec<u8>,
    field: Option<PointField>,
    /// `title|artist` of the field being shown.
    track_id: Option<String>,
    running: bool,
    reconnect_at: Option<Instant>,
    energy: BandEnergy,
    canvas: Canvas,
    epoch: Instant,
}

impl MeshVisualizer {
    pub fn new(settings: VisualSettings, slot: SharedAnalyser, width: usize, height: usize) -> Self {
        Self {
            settings,
            slot,
            analyser: None,
            spectrum: Vec::new(),
            field: None,
            track_id: None,
            running: false,
            reconnect_at: None,
            energy: BandEnergy::default(),
            canvas: Canvas::new(width, height),
            epoch: Instant::now(),
        }
    }

    /// Pick up the shared analysis node. Without `force` this only fills an
    /// empty handle. Returns whether a node is held afterwards.
    pub fn connect_audio(&mut self, force: bool) -> bool {
        if force || self.analyser.is_none() {
            if let Some(analyser) = self.slot.get() {
                self.spectrum = vec![0; analyser.bin_count()];
                self.analyser = Some(analyser.clone());
                log::debug!("visualizer connected to analysis node");
            }
        }
        self.analyser.is_some()
    }

    /// Begin animating the field for a track. Returns `false` when the same
    /// track is already running and nothing was regenerated.
    pub fn start(&mut self, title: &str, artist: &str, now: Instant) -> bool {
        let track_id = format!("{title}|{artist}");
        if self.running && self.track_id.as_deref() == Some(track_id.as_str()) {
            return false;
        }

        log::info!("visualizer starting for {} - {}", artist, title);
        self.track_id = Some(track_id);
        self.field = Some(derive_palette(title, artist));

        // The stream may not have produced a node yet.
        self.reconnect_at = if self.connect_audio(true) {
            None
        } else {
            Some(now + Duration::from_millis(self.settings.reconnect_delay_ms))
        };
        self.running = true;
        true
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.track_id = None;
        self.field = None;
        self.reconnect_at = None;
        self.energy = BandEnergy::default();
        self.canvas.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn track_id(&self) -> Option<&str> {
        self.track_id.as_deref()
    }

    pub fn field(&self) -> Option<&PointField> {
        self.field.as_ref()
    }

    pub fn energy(&self) -> BandEnergy {
        self.energy
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.canvas.resize(width, height);
    }

    /// Advance and draw one frame. Returns `false` when stopped.
    pub fn frame(&mut self, now: Instant) -> bool {
        if !self.running {
            return false;
        }
        if self.reconnect_at.is_some_and(|at| now >= at) {
            self.reconnect_at = None;
            self.connect_audio(true);
        }

        self.energy = self.analyze();
        let t = now.saturating_duration_since(self.epoch).as_secs_f64();
        self.update_points(t);
        self.render();
        true
    }

    fn analyze(&mut self) -> BandEnergy {
        let Some(analyser) = &self.analyser else {
            return BandEnergy::default();
        };
        match analyser.byte_frequency_data(&mut self.spectrum) {
            Ok(()) => BandEnergy::from_spectrum(&self.spectrum),
            Err(e) => {
                log::warn!("frequency read failed: {}", e);
                BandEnergy::default()
            }
        }
    }

    fn update_points(&mut self, t: f64) {
        let Some(field) = self.field.as_mut() else {
            return;
        };
        let e = self.energy;

        for (index, p) in field.points.iter_mut().enumerate() {
            let angle = t * p.speed + p.phase;
            let swap = (t * p.swap_speed + p.swap_phase).sin() * PI * 0.5;
            let radius_variation = (t * p.speed * 2.0).sin() * 0.05;
            let current_radius = p.base_radius + radius_variation + e.bass * 0.08;
            let vibration = (t * 20.0 + p.vibration_phase).sin() * e.bass * 0.04;
            let high_offset = e.high * 0.4 * (t * 4.0).sin();
            let center_phase = t * 0.8 + index as f64;
            let center_x = center_phase.sin() * e.overall * 0.08;
            let center_y = center_phase.cos() * e.overall * 0.08;

            let theta = angle + high_offset + swap;
            let reach = current_radius + vibration;
            let target_x = 0.5 + center_x + theta.cos() * reach;
            let target_y = 0.5 + center_y + theta.sin() * reach;

            p.x += (target_x - p.x) * POSITION_SMOOTHING;
            p.y += (target_y - p.y) * POSITION_SMOOTHING;

            let target_size = p.base_size + e.bass * 100.0;
            p.size += (target_size - p.size) * SIZE_SMOOTHING;
        }
    }

    fn render(&mut self) {
        self.canvas.clear();
        let Some(field) = &self.field else {
            return;
        };
        let width = self.canvas.width() as f64;
        let height = self.canvas.height() as f64;
        let scale = width / f64::from(self.settings.reference_width);

        let boost = (self.energy.bass * 0.3) as f32;
        let stops = GradientStops {
            center: 0.6 + boost,
            middle: 0.3 + boost * 0.5,
        };
        for p in &field.points {
            self.canvas.add_radial_gradient(
                (p.x * width) as f32,
                (p.y * height) as f32,
                (p.size * scale) as f32,
                p.color,
                stops,
            );
        }
        self.canvas.blur(self.settings.blur_radius * scale as f32);
    }
}
