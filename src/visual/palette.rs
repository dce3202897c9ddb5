//! Deterministic colour and motion parameters per track.
//!
//! Everything here is a pure function of `(title, artist)`: the same pair
//! always yields the same palette, point count and per-point parameters,
//! bit for bit.

use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const fn hex(v: u32) -> Rgb {
    Rgb {
        r: (v >> 16) as u8,
        g: (v >> 8) as u8,
        b: v as u8,
    }
}

pub const PALETTES: [[Rgb; 5]; 8] = [
    // violet / pink
    [hex(0x6B5B95), hex(0xB565A7), hex(0xD4A5A5), hex(0x9B59B6), hex(0xE91E63)],
    // blue / cyan
    [hex(0x2E86AB), hex(0x06BCC1), hex(0x5FA8D3), hex(0x1B4965), hex(0x62B6CB)],
    // orange / red
    [hex(0xFF6B6B), hex(0xFFA07A), hex(0xFF8C42), hex(0xFF595E), hex(0xFFCA3A)],
    // green
    [hex(0x52B788), hex(0x95D5B2), hex(0xB7E4C7), hex(0x74C69D), hex(0x40916C)],
    // purple / blue
    [hex(0x7209B7), hex(0x560BAD), hex(0x3A0CA3), hex(0x4361EE), hex(0x4CC9F0)],
    // gold / rose
    [hex(0xFF9F1C), hex(0xFFBF69), hex(0xFF5D8F), hex(0xEE6C4D), hex(0xC9ADA7)],
    // sea
    [hex(0x06FFA5), hex(0x00D9FF), hex(0x0496FF), hex(0x006BA6), hex(0x023E7D)],
    // sunset
    [hex(0xFF006E), hex(0xFB5607), hex(0xFFBE0B), hex(0x8338EC), hex(0x3A86FF)],
];

/// 32-bit `h = h * 31 + unit` hash over the UTF-16 code units of the
/// lowercased `title + artist`, returned as its absolute value.
pub fn track_seed(title: &str, artist: &str) -> u32 {
    let text = format!("{title}{artist}").to_lowercase();
    let hash = text
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    hash.unsigned_abs()
}

/// Linear-congruential sequence (multiplier 9301, increment 49297,
/// modulus 233280) yielding floats in `[0, 1)`.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    state: u64,
}

impl SeededRandom {
    const MULTIPLIER: u64 = 9301;
    const INCREMENT: u64 = 49297;
    const MODULUS: u64 = 233_280;

    pub fn new(seed: u32) -> Self {
        Self {
            state: u64::from(seed),
        }
    }

    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * Self::MULTIPLIER + Self::INCREMENT) % Self::MODULUS;
        self.state as f64 / Self::MODULUS as f64
    }
}

/// One animated gradient blob. Positions are fractions of the surface,
/// sizes are reference pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPoint {
    pub x: f64,
    pub y: f64,
    pub base_angle: f64,
    pub color: Rgb,
    pub radius: f64,
    pub speed: f64,
    pub move_radius: f64,
    pub base_radius: f64,
    pub phase: f64,
    pub size: f64,
    pub base_size: f64,
    pub vibration_phase: f64,
    pub vibration_speed: f64,
    pub swap_phase: f64,
    pub swap_speed: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointField {
    pub seed: u32,
    pub palette_index: usize,
    pub points: Vec<MeshPoint>,
}

impl PointField {
    pub fn palette(&self) -> &'static [Rgb; 5] {
        &PALETTES[self.palette_index]
    }
}

pub fn derive_palette(title: &str, artist: &str) -> PointField {
    let seed = track_seed(title, artist);
    let palette_index = seed as usize % PALETTES.len();
    let palette = &PALETTES[palette_index];
    let count = 6 + seed as usize % 5;
    let mut rng = SeededRandom::new(seed);

    let points = (0..count)
        .map(|i| {
            let base_angle = i as f64 / count as f64 * TAU;
            // Draw order is part of the contract.
            let radius = 0.08 + rng.next_f64() * 0.08;
            let speed = 0.001 + rng.next_f64() * 0.002;
            let move_radius = 0.05 + rng.next_f64() * 0.08;
            let base_radius = 0.05 + rng.next_f64() * 0.08;
            let phase = rng.next_f64() * TAU;
            let size = 150.0 + rng.next_f64() * 200.0;
            let base_size = 150.0 + rng.next_f64() * 200.0;
            let vibration_phase = rng.next_f64() * TAU;
            let vibration_speed = 0.1 + rng.next_f64() * 0.2;
            let swap_phase = rng.next_f64() * TAU;
            let swap_speed = 0.0005 + rng.next_f64() * 0.001;

            MeshPoint {
                x: 0.5 + base_angle.cos() * radius,
                y: 0.5 + base_angle.sin() * radius,
                base_angle,
                color: palette[i % palette.len()],
                radius,
                speed,
                move_radius,
                base_radius,
                phase,
                size,
                base_size,
                vibration_phase,
                vibration_speed,
                swap_phase,
                swap_speed,
            }
        })
        .collect();

    PointField {
        seed,
        palette_index,
        points,
    }
}
