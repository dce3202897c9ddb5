//! Software raster target for the gradient field.
//!
//! Pixels hold premultiplied RGBA in `[0, 1]`. Gradients accumulate
//! additively; channels are only clamped on read-out.

use super::palette::Rgb;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStops {
    pub center: f32,
    pub middle: f32,
}

impl GradientStops {
    /// Alpha at `t`, the distance from the centre as a fraction of the radius.
    fn alpha_at(self, t: f32) -> f32 {
        if t >= 1.0 {
            0.0
        } else if t <= 0.5 {
            self.center + (self.middle - self.center) * (t / 0.5)
        } else {
            self.middle * (1.0 - (t - 0.5) / 0.5)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<[f32; 4]>,
    scratch: Vec<[f32; 4]>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; width * height],
            scratch: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![[0.0; 4]; width * height];
    }

    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = [0.0; 4]);
    }

    pub fn is_clear(&self) -> bool {
        self.pixels.iter().all(|p| *p == [0.0; 4])
    }

    /// Add a radial gradient of `color` centred at `(cx, cy)`.
    pub fn add_radial_gradient(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        color: Rgb,
        stops: GradientStops,
    ) {
        if radius <= 0.0 || self.width == 0 || self.height == 0 {
            return;
        }
        let rgb = [
            f32::from(color.r) / 255.0,
            f32::from(color.g) / 255.0,
            f32::from(color.b) / 255.0,
        ];

        // Only the covered square is visited.
        let x0 = (cx - radius).floor().max(0.0) as usize;
        let y0 = (cy - radius).floor().max(0.0) as usize;
        let x1 = ((cx + radius).ceil().max(0.0) as usize).min(self.width);
        let y1 = ((cy + radius).ceil().max(0.0) as usize).min(self.height);

        for y in y0..y1 {
            let dy = y as f32 + 0.5 - cy;
            let row = y * self.width;
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - cx;
                let t = (dx * dx + dy * dy).sqrt() / radius;
                let alpha = stops.alpha_at(t);
                if alpha <= 0.0 {
                    continue;
                }
                let px = &mut self.pixels[row + x];
                px[0] += rgb[0] * alpha;
                px[1] += rgb[1] * alpha;
                px[2] += rgb[2] * alpha;
                px[3] += alpha;
            }
        }
    }

    /// Approximate a gaussian blur with standard deviation `sigma` pixels by
    /// three box-blur passes in each direction. Pixels outside the canvas
    /// count as transparent.
    pub fn blur(&mut self, sigma: f32) {
        let radius = box_radius(sigma);
        if radius == 0 || self.pixels.is_empty() {
            return;
        }
        self.scratch.resize(self.pixels.len(), [0.0; 4]);
        for _ in 0..3 {
            box_pass(&self.pixels, &mut self.scratch, self.width, self.height, radius, true);
            box_pass(&self.scratch, &mut self.pixels, self.width, self.height, radius, false);
        }
    }

    /// Clamped 8-bit colour of the pixel at `(x, y)`, if in bounds.
    pub fn rgb_at(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let p = self.pixels[y * self.width + x];
        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Some(Rgb {
            r: to_u8(p[0]),
            g: to_u8(p[1]),
            b: to_u8(p[2]),
        })
    }

    pub fn alpha_at(&self, x: usize, y: usize) -> Option<f32> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x][3])
    }
}

/// Box radius whose three-pass variance matches `sigma^2`.
fn box_radius(sigma: f32) -> usize {
    if !(sigma.is_finite() && sigma > 0.0) {
        return 0;
    }
    let width = (4.0 * sigma * sigma + 1.0).sqrt();
    ((width - 1.0) / 2.0).round() as usize
}

fn box_pass(
    src: &[[f32; 4]],
    dst: &mut [[f32; 4]],
    width: usize,
    height: usize,
    radius: usize,
    horizontal: bool,
) {
    let (lines, len) = if horizontal {
        (height, width)
    } else {
        (width, height)
    };
    let index = |line: usize, i: usize| {
        if horizontal {
            line * width + i
        } else {
            i * width + line
        }
    };
    let norm = 1.0 / (2 * radius + 1) as f32;

    for line in 0..lines {
        let mut acc = [0.0f32; 4];
        for i in 0..radius.min(len) {
            add(&mut acc, &src[index(line, i)], 1.0);
        }
        for i in 0..len {
            let incoming = i + radius;
            if incoming < len {
                add(&mut acc, &src[index(line, incoming)], 1.0);
            }
            dst[index(line, i)] = acc.map(|v| (v * norm).max(0.0));
            if i >= radius {
                add(&mut acc, &src[index(line, i - radius)], -1.0);
            }
        }
    }
}

fn add(acc: &mut [f32; 4], px: &[f32; 4], sign: f32) {
    for c in 0..4 {
        acc[c] += px[c] * sign;
    }
}
