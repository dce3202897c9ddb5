//! Animated gradient background driven by the playing stream's spectrum.

mod canvas;
mod driver;
mod energy;
mod palette;

pub use canvas::{Canvas, GradientStops};
pub use driver::MeshVisualizer;
pub use energy::BandEnergy;
pub use palette::{MeshPoint, PALETTES, PointField, Rgb, SeededRandom, derive_palette, track_seed};

#[cfg(test)]
mod tests;
