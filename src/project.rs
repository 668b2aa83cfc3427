//! Mapping processed samples and spectral bins onto the pixel grid.

use std::f32::consts::PI;

use rustfft::num_complex::Complex;

use crate::params::Params;
use crate::spectral::Plane;
use crate::trigger::Trigger;

/// How a layer merges into the persistence grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    /// Saturating per-channel sum.
    Add,
    /// Per-channel maximum.
    Lighten,
}

/// One frame's worth of contributions, three channels per cell.
#[derive(Debug, Clone)]
pub struct Layer {
    width: usize,
    height: usize,
    blend: Blend,
    cells: Vec<[f32; 3]>,
}

impl Layer {
    pub fn new(width: usize, height: usize, blend: Blend) -> Layer {
        Layer {
            width,
            height,
            blend,
            cells: vec![[0.0; 3]; width * height],
        }
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn blend(&self) -> Blend { self.blend }
    pub fn cells(&self) -> &[[f32; 3]] { &self.cells }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = [0.0; 3];
        }
    }

    pub fn get(&self, x: usize, y: usize) -> [f32; 3] {
        self.cells[y * self.width + x]
    }

    /// Merges `rgb` into cell `(x, y)` by per-channel maximum.
    pub fn plot(&mut self, x: usize, y: usize, rgb: [f32; 3]) {
        let cell = &mut self.cells[y * self.width + x];
        for (c, v) in cell.iter_mut().zip(rgb) {
            if v > *c {
                *c = v;
            }
        }
    }

    fn raise(&mut self, x: usize, y: usize, chan: usize, v: f32) {
        let c = &mut self.cells[y * self.width + x][chan];
        if v > *c {
            *c = v;
        }
    }

    /// Cells with any channel above zero.
    pub fn lit(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let w = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.iter().any(|&v| v > 0.0))
            .map(move |(i, _)| (i % w, i / w))
    }

    pub fn is_dark(&self) -> bool {
        self.lit().next().is_none()
    }
}

/// Plots `signal[trig.index ..]` rotated by the trigger phase: real part on the
/// vertical axis, imaginary part on the horizontal, scaled by the shorter side.
pub fn scatter(signal: &[Complex<f32>], trig: &Trigger, params: &Params, layer: &mut Layer) {
    let _g = hprof::enter("project::scatter");
    let (w, h) = (layer.width() as i64, layer.height() as i64);
    let span = w.min(h) as f32;
    let len = signal.len();
    let falloff = params.bleed() as f32 / 256.0;
    let radius = params.bleed_radius() as i64;

    for n in trig.index .. len {
        let z = signal[n] * trig.rotation;
        let y = (z.re * span + (h / 2) as f32).floor();
        let x = (z.im * span + (w / 2) as f32).floor();
        if !(x >= 0.0 && y >= 0.0 && x < w as f32 && y < h as f32) {
            continue;
        }
        let (x, y) = (x as i64, y as i64);
        let ramp = trig.ramp(n, len);
        let (red, blue) = (ramp, 1.0 - ramp);
        layer.plot(x as usize, y as usize, [red, 1.0, blue]);

        for d in 1 ..= radius {
            let glow = blue - d as f32 * falloff;
            if glow <= 0.0 {
                break;
            }
            for x2 in [x - d, x + d] {
                if x2 >= 0 && x2 < w {
                    layer.raise(x2 as usize, y as usize, 2, glow);
                }
            }
        }
        for d in 1 ..= radius {
            let glow = red - d as f32 * falloff;
            if glow <= 0.0 {
                break;
            }
            for y2 in [y - d, y + d] {
                if y2 >= 0 && y2 < h {
                    layer.raise(x as usize, y2 as usize, 0, glow);
                }
            }
        }
    }
}

/// HSV in [0, 1] to RGB in [0, 1].
pub fn hsv(h: f32, s: f32, v: f32) -> [f32; 3] {
    let h = (h.rem_euclid(1.0)) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as u32 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

/// Colour of one 2D bin: phase to hue, log magnitude to value, strong bins desaturate.
pub fn bin_colour(z: Complex<f32>, offset: f32, saturation: f32) -> [f32; 3] {
    let mag = z.norm().log10() + offset;
    if !(mag > 0.0) {
        return [0.0; 3];
    }
    let hue = (z.arg() + PI) / (2.0 * PI);
    let sat = 1.0 - ((mag - 1.0) * saturation).max(0.0).clamp(0.0, 1.0);
    hsv(hue, sat, mag.clamp(0.0, 1.0))
}

/// Colours every layer cell from the plane, zero frequency at the centre.
pub fn spectrogram(plane: &Plane, params: &Params, layer: &mut Layer) {
    let _g = hprof::enter("project::spectrogram");
    let (xs, ys) = (layer.width(), layer.height());
    let size = plane.size();
    let xstep = (size / xs.max(1)).max(1);
    let ystep = (size / ys.max(1)).max(1);
    for y in 0 .. ys {
        for x in 0 .. xs {
            let px = (x * xstep) % size;
            let py = (y * ystep) % size;
            let rgb = bin_colour(plane.bin(px, py), params.offset(), params.saturation());
            layer.plot((x + xs / 2) % xs, (y + ys / 2) % ys, rgb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Complex<f32> {
        Complex::new(1.0, 0.0)
    }

    #[test]
    fn test_plot_merges_by_max() {
        let mut layer = Layer::new(4, 4, Blend::Add);
        layer.plot(1, 2, [0.5, 0.2, 0.0]);
        layer.plot(1, 2, [0.1, 0.7, 0.3]);
        assert_eq!(layer.get(1, 2), [0.5, 0.7, 0.3]);
        assert_eq!(layer.lit().collect::<Vec<_>>(), vec![(1, 2)]);
        layer.clear();
        assert!(layer.is_dark());
    }

    #[test]
    fn test_scatter_places_trigger_on_real_axis() {
        let mut params = Params::scatter();
        params.set_bleed(128);
        let mut layer = Layer::new(20, 20, Blend::Add);
        let signal = vec![Complex::new(0.0, -0.25), Complex::new(0.25, 0.0)];
        let trig = Trigger { index: 1, rotation: unit() };
        scatter(&signal, &trig, &params, &mut layer);
        // y = floor(0.25 * 20 + 10), x = floor(0 + 10)
        assert_eq!(layer.get(10, 15)[1], 1.0);
        // sample before the trigger is not drawn
        assert_eq!(layer.get(5, 10), [0.0; 3]);
    }

    #[test]
    fn test_scatter_bleed_falls_off_linearly() {
        let mut params = Params::scatter();
        params.set_bleed(64);
        let mut layer = Layer::new(16, 16, Blend::Add);
        let signal = vec![Complex::new(0.0, 0.0), Complex::new(0.0, -0.25)];
        let trig = Trigger { index: 0, rotation: unit() };
        scatter(&signal, &trig, &params, &mut layer);
        // falloff 0.25 per pixel; n = 0 has ramp 0 (blue seed 1), n = 1 ramp 0.5
        assert_eq!(layer.get(8, 8), [0.0, 1.0, 1.0]);
        assert_eq!(layer.get(9, 8)[2], 0.75);
        assert_eq!(layer.get(11, 8)[2], 0.25);
        assert_eq!(layer.get(12, 8)[2], 0.0);
        assert_eq!(layer.get(8, 9)[0], 0.0);
        assert_eq!(layer.get(4, 8), [0.5, 1.0, 0.5]);
        assert_eq!(layer.get(4, 9)[0], 0.25);
        assert_eq!(layer.get(4, 7)[0], 0.25);
        assert_eq!(layer.get(4, 10)[0], 0.0);
    }

    #[test]
    fn test_scatter_discards_outside() {
        let params = Params::scatter();
        let mut layer = Layer::new(8, 8, Blend::Add);
        let signal = vec![Complex::new(0.0, 0.0), Complex::new(3.0, 3.0), Complex::new(-3.0, 0.0)];
        let trig = Trigger { index: 1, rotation: unit() };
        scatter(&signal, &trig, &params, &mut layer);
        assert!(layer.is_dark());
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv(0.0, 1.0, 1.0), [1.0, 0.0, 0.0]);
        let g = hsv(1.0 / 3.0, 1.0, 1.0);
        assert!((g[1] - 1.0).abs() < 1e-6 && g[0].abs() < 1e-5 && g[2].abs() < 1e-6);
        assert_eq!(hsv(0.5, 0.0, 0.25), [0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_bin_colour_ranges() {
        assert_eq!(bin_colour(Complex::new(0.0, 0.0), 1.0, 0.5), [0.0; 3]);
        // log10(10) + 1 = 2: full value, saturation 1 - 0.5
        let rgb = bin_colour(Complex::new(-10.0, 0.0), 1.0, 0.5);
        assert!(rgb.iter().all(|&c| (0.0 ..= 1.0).contains(&c)));
        assert!((rgb.iter().cloned().fold(0.0, f32::max) - 1.0).abs() < 1e-6);
        assert!((rgb.iter().cloned().fold(1.0, f32::min) - 0.5).abs() < 1e-5);
    }
}
