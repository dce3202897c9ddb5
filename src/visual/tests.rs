use std::time::{Duration, Instant};

use crate::analysis::{Analyser, SharedAnalyser};
use crate::config::{AnalysisSettings, VisualSettings};
use crate::playback::StreamId;

use super::*;

fn visualizer(slot: SharedAnalyser) -> MeshVisualizer {
    MeshVisualizer::new(VisualSettings::default(), slot, 120, 60)
}

#[test]
fn seed_matches_reference_hash() {
    assert_eq!(track_seed("a", "b"), 3105);
    assert_eq!(track_seed("A", "B"), 3105);
    assert_eq!(track_seed("", ""), 0);
}

#[test]
fn seed_wraps_and_takes_absolute_value() {
    // Long inputs overflow 32 bits many times over; the result must still
    // be stable and non-negative as an i32 magnitude.
    let a = track_seed("a very long title that keeps going and going", "and an artist");
    let b = track_seed("A Very Long Title That Keeps Going And Going", "AND AN ARTIST");
    assert_eq!(a, b);
    assert!(a <= 1 << 31);
}

#[test]
fn seeded_random_follows_lcg() {
    let mut rng = SeededRandom::new(3105);
    assert_eq!(rng.next_f64(), 2182.0 / 233_280.0);
    let second = (2182u64 * 9301 + 49297) % 233_280;
    assert_eq!(rng.next_f64(), second as f64 / 233_280.0);
}

#[test]
fn derive_palette_is_deterministic() {
    let a = derive_palette("Song A", "Artist B");
    let b = derive_palette("Song A", "Artist B");
    assert_eq!(a, b);
    assert_ne!(a.seed, derive_palette("Song B", "Artist A").seed);
}

#[test]
fn derive_palette_layout_for_known_seed() {
    let field = derive_palette("a", "b");
    assert_eq!(field.seed, 3105);
    assert_eq!(field.palette_index, 1);
    assert_eq!(field.points.len(), 6);
    assert_eq!(field.palette(), &PALETTES[1]);

    let first = &field.points[0];
    assert_eq!(first.radius, 0.08 + 2182.0 / 233_280.0 * 0.08);
    assert_eq!(first.base_angle, 0.0);
    assert_eq!(first.x, 0.5 + first.radius);
    assert_eq!(first.y, 0.5);
    assert_eq!(first.color, PALETTES[1][0]);
    assert_eq!(field.points[5].color, PALETTES[1][0]);
    assert_eq!(field.points[4].color, PALETTES[1][4]);
}

#[test]
fn point_parameters_stay_in_range() {
    for (title, artist) in [("x", "y"), ("Blue Monday", "New Order"), ("Ёлка", "Ария")] {
        let field = derive_palette(title, artist);
        assert!((6..=10).contains(&field.points.len()));
        for p in &field.points {
            assert!((0.08..0.16).contains(&p.radius));
            assert!((0.001..0.003).contains(&p.speed));
            assert!((0.05..0.13).contains(&p.move_radius));
            assert!((0.05..0.13).contains(&p.base_radius));
            assert!((150.0..350.0).contains(&p.size));
            assert!((150.0..350.0).contains(&p.base_size));
            assert!((0.1..0.3).contains(&p.vibration_speed));
            assert!((0.0005..0.0015).contains(&p.swap_speed));
        }
    }
}

#[test]
fn palette_hex_decoding() {
    assert_eq!(PALETTES[0][0], Rgb { r: 0x6B, g: 0x5B, b: 0x95 });
    assert_eq!(PALETTES[7][4], Rgb { r: 0x3A, g: 0x86, b: 0xFF });
}

#[test]
fn band_energy_splits_by_index_fraction() {
    // 20 bins: bass [0,3), mid [3,10), high [10,20).
    let mut bins = vec![0u8; 20];
    bins[..3].iter_mut().for_each(|b| *b = 255);
    bins[10..].iter_mut().for_each(|b| *b = 51);
    let e = BandEnergy::from_spectrum(&bins);
    assert_eq!(e.bass, 1.0);
    assert_eq!(e.mid, 0.0);
    assert!((e.high - 0.2).abs() < 1e-12);
    let expected_overall = (3.0 * 255.0 + 10.0 * 51.0) / 20.0 / 255.0;
    assert!((e.overall - expected_overall).abs() < 1e-12);
}

#[test]
fn band_energy_handles_tiny_and_empty_spectra() {
    assert_eq!(BandEnergy::from_spectrum(&[]), BandEnergy::default());
    let e = BandEnergy::from_spectrum(&[255, 255]);
    assert_eq!(e.bass, 0.0);
    assert_eq!(e.mid, 0.0);
    assert_eq!(e.high, 1.0);
}

#[test]
fn gradient_fades_from_center() {
    let mut canvas = Canvas::new(41, 41);
    let color = Rgb { r: 255, g: 0, b: 0 };
    let stops = GradientStops {
        center: 0.6,
        middle: 0.3,
    };
    canvas.add_radial_gradient(20.5, 20.5, 20.0, color, stops);

    let center = canvas.alpha_at(20, 20).unwrap();
    let half = canvas.alpha_at(30, 20).unwrap();
    let edge = canvas.alpha_at(40, 20).unwrap();
    assert!((center - 0.6).abs() < 1e-6);
    assert!((half - 0.3).abs() < 1e-6);
    assert_eq!(edge, 0.0);
    assert_eq!(canvas.rgb_at(20, 20), Some(Rgb { r: 153, g: 0, b: 0 }));
    assert_eq!(canvas.rgb_at(0, 0), Some(Rgb { r: 0, g: 0, b: 0 }));
}

#[test]
fn gradients_accumulate_and_clamp() {
    let mut canvas = Canvas::new(4, 4);
    let white = Rgb { r: 255, g: 255, b: 255 };
    let stops = GradientStops {
        center: 0.9,
        middle: 0.9,
    };
    for _ in 0..3 {
        canvas.add_radial_gradient(2.0, 2.0, 100.0, white, stops);
    }
    assert_eq!(canvas.rgb_at(1, 1), Some(white));
    assert!(canvas.alpha_at(1, 1).unwrap() > 2.0);
}

#[test]
fn blur_spreads_energy_and_keeps_mass() {
    let mut canvas = Canvas::new(64, 64);
    let stops = GradientStops {
        center: 1.0,
        middle: 1.0,
    };
    canvas.add_radial_gradient(32.0, 32.0, 1.0, Rgb { r: 255, g: 255, b: 255 }, stops);
    let before: f32 = (0..64)
        .flat_map(|y| (0..64).map(move |x| (x, y)))
        .map(|(x, y)| canvas.alpha_at(x, y).unwrap())
        .sum();

    canvas.blur(4.0);
    let after: f32 = (0..64)
        .flat_map(|y| (0..64).map(move |x| (x, y)))
        .map(|(x, y)| canvas.alpha_at(x, y).unwrap())
        .sum();

    assert!((before - after).abs() < 1e-3 * before);
    assert!(canvas.alpha_at(36, 32).unwrap() > 0.0);
    assert!(canvas.alpha_at(31, 31).unwrap() < 1.0);
}

#[test]
fn start_twice_for_same_track_keeps_field() {
    let mut vis = visualizer(SharedAnalyser::default());
    let t0 = Instant::now();
    assert!(vis.start("X", "Y", t0));
    vis.frame(t0 + Duration::from_millis(16));
    vis.frame(t0 + Duration::from_millis(32));
    let animated = vis.field().cloned();

    assert!(!vis.start("X", "Y", t0 + Duration::from_millis(40)));
    assert_eq!(vis.field().cloned(), animated);
    assert_ne!(vis.field().cloned(), Some(derive_palette("X", "Y")));
}

#[test]
fn start_for_new_track_regenerates() {
    let mut vis = visualizer(SharedAnalyser::default());
    let t0 = Instant::now();
    vis.start("X", "Y", t0);
    vis.frame(t0);
    assert!(vis.start("Other", "Artist", t0));
    assert_eq!(vis.field(), Some(&derive_palette("Other", "Artist")));
    assert_eq!(vis.track_id(), Some("Other|Artist"));
}

#[test]
fn start_after_stop_is_fresh() {
    let mut vis = visualizer(SharedAnalyser::default());
    let t0 = Instant::now();
    vis.start("X", "Y", t0);
    vis.stop();
    assert!(!vis.is_running());
    assert!(vis.track_id().is_none());
    assert!(vis.start("X", "Y", t0));
}

#[test]
fn without_analysis_node_energy_is_zero_and_stop_clears() {
    let mut vis = visualizer(SharedAnalyser::default());
    assert!(!vis.connect_audio(false));
    let t0 = Instant::now();
    vis.start("X", "Y", t0);
    assert!(vis.frame(t0 + Duration::from_millis(16)));
    assert_eq!(vis.energy(), BandEnergy::default());
    assert!(!vis.canvas().is_clear());

    vis.stop();
    assert!(vis.canvas().is_clear());
    assert!(!vis.frame(t0 + Duration::from_millis(32)));
    assert!(vis.canvas().is_clear());
}

#[test]
fn pending_reconnect_fires_on_frame() {
    let slot = SharedAnalyser::default();
    let mut vis = visualizer(slot.clone());
    let t0 = Instant::now();
    vis.start("X", "Y", t0);

    let analyser = Analyser::shared(&slot, &AnalysisSettings::default());
    let id = StreamId::from_raw(1).unwrap();
    analyser.connect(id);
    let mut writer = analyser.writer(id);
    for i in 0..512 {
        let phase = 2.0 * std::f32::consts::PI * 4.0 * i as f32 / 512.0;
        writer.push(phase.sin());
    }
    writer.flush();

    vis.frame(t0 + Duration::from_millis(20));
    assert_eq!(vis.energy(), BandEnergy::default());

    vis.frame(t0 + Duration::from_millis(120));
    assert!(vis.energy().bass > 0.0);
}

#[test]
fn connect_audio_picks_up_existing_node() {
    let slot = SharedAnalyser::default();
    let node = Analyser::shared(&slot, &AnalysisSettings::default());
    let mut vis = visualizer(slot);
    assert!(vis.connect_audio(false));

    let t0 = Instant::now();
    vis.start("X", "Y", t0);
    vis.frame(t0);
    // Detached node: reads succeed and report silence.
    node.detach();
    vis.frame(t0 + Duration::from_millis(16));
    assert_eq!(vis.energy(), BandEnergy::default());
}
