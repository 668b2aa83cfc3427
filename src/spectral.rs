//! Forward/inverse transforms feeding both scope variants.
//!
//! Scatter mode builds an analytic signal with [`Analytic`]. Spectrum mode
//! resamples each frame to display resolution with [`Resampler`], stacks the
//! lines in a [`ScanRing`], and takes the 2D transform of the ring in a [`Plane`].

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::Error;
use crate::window::{Window, WindowFn};

/// Divisor taking raw `i16` samples to [-1, 1).
pub const FULL_SCALE: f32 = 32768.0;

const ZERO: Complex<f32> = Complex { re: 0.0, im: 0.0 };

/// Distinct lengths a plan cache holds before it starts over.
const MAX_PLANS: usize = 4;

fn fit_scratch(scratch: &mut Vec<Complex<f32>>, fft: &Arc<dyn Fft<f32>>) {
    let len = fft.get_inplace_scratch_len();
    if scratch.len() < len {
        scratch.resize(len, ZERO);
    }
}

/// Transform plans by length, reused across passes. Each direction keeps at
/// most `MAX_PLANS` lengths; a new length beyond that drops the rest.
#[derive(Default)]
struct Plans {
    forward: HashMap<usize, Arc<dyn Fft<f32>>>,
    inverse: HashMap<usize, Arc<dyn Fft<f32>>>,
}

fn cached(
    map: &mut HashMap<usize, Arc<dyn Fft<f32>>>,
    n: usize,
    plan: impl FnOnce(&mut FftPlanner<f32>) -> Arc<dyn Fft<f32>>,
) -> Arc<dyn Fft<f32>> {
    if !map.contains_key(&n) && map.len() >= MAX_PLANS {
        map.clear();
    }
    map.entry(n).or_insert_with(|| plan(&mut FftPlanner::new())).clone()
}

impl Plans {
    fn forward(&mut self, n: usize) -> Arc<dyn Fft<f32>> {
        cached(&mut self.forward, n, |p| p.plan_fft_forward(n))
    }

    fn inverse(&mut self, n: usize) -> Arc<dyn Fft<f32>> {
        cached(&mut self.inverse, n, |p| p.plan_fft_inverse(n))
    }
}

/// One-sided analytic signal of a real frame.
pub struct Analytic {
    plans: Plans,
    buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Analytic {
    pub fn new(frame: usize) -> Analytic {
        let mut plans = Plans::default();
        // plan the steady-state length up front
        if frame > 0 {
            plans.forward(frame);
            plans.inverse(frame);
        }
        Analytic {
            plans,
            buf: Vec::with_capacity(frame),
            scratch: Vec::new(),
        }
    }

    /// Transforms `samples`, drops bins `N/2 ..`, and inverts, scaled by `scale / N`.
    pub fn process(&mut self, samples: &[i16], scale: f32) -> &[Complex<f32>] {
        let _g = hprof::enter("Analytic::process");
        let n = samples.len();
        self.buf.clear();
        self.buf.extend(samples.iter().map(|&s| Complex::new(s as f32 / FULL_SCALE, 0.0)));
        if n == 0 {
            return &self.buf;
        }

        let fwd = self.plans.forward(n);
        fit_scratch(&mut self.scratch, &fwd);
        fwd.process_with_scratch(&mut self.buf, &mut self.scratch);

        for bin in &mut self.buf[n / 2 ..] {
            *bin = ZERO;
        }

        let inv = self.plans.inverse(n);
        fit_scratch(&mut self.scratch, &inv);
        inv.process_with_scratch(&mut self.buf, &mut self.scratch);

        let gain = scale / n as f32;
        for v in &mut self.buf {
            *v *= gain;
        }
        &self.buf
    }
}

/// Resamples a frame onto a `width`-sample line through the frequency domain.
///
/// The frame is always transformed at full `frame` length. A short batch of `M`
/// samples is split around sample 0 and zero-padded, so it fills `M/frame` of the
/// line and the rest stays silent.
pub struct Resampler {
    frame: usize,
    width: usize,
    plans: Plans,
    pre: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    line: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    window: WindowFn,
    shape: Option<Box<dyn Window>>,
}

impl Resampler {
    pub fn new(frame: usize, width: usize, window: WindowFn) -> Resampler {
        Resampler {
            frame,
            width,
            plans: Plans::default(),
            pre: Vec::with_capacity(frame),
            spectrum: vec![ZERO; frame],
            line: vec![ZERO; width],
            scratch: Vec::new(),
            window,
            shape: None,
        }
    }

    pub fn width(&self) -> usize { self.width }

    pub fn resize(&mut self, width: usize) {
        self.width = width;
        self.line = vec![ZERO; width];
    }

    /// Highest bin kept on each side of zero: `(bandwidth - 1) / 2`, so positive
    /// and negative halves always pair up.
    fn half_band(&self, bandwidth: usize) -> usize {
        let b = bandwidth.clamp(1, self.width.max(1));
        ((b - 1) / 2).min(self.frame.saturating_sub(1) / 2)
    }

    /// Keeps bins `-h ..= h` of the frame spectrum, `h = (bandwidth - 1) / 2`, and
    /// returns the inverse-transformed line. Where samples exist the line has the
    /// same amplitude as the input, whatever the frame and line lengths.
    pub fn process(&mut self, samples: &[i16], bandwidth: usize) -> &mut [Complex<f32>] {
        let _g = hprof::enter("Resampler::process");
        let frame = self.frame;
        let m = samples.len().min(frame);
        let w = self.width;
        for v in &mut self.line {
            *v = ZERO;
        }
        if m == 0 || w == 0 {
            return &mut self.line;
        }

        self.pre.clear();
        self.pre.extend(samples[.. m].iter().map(|&s| s as f32 / FULL_SCALE));
        if self.shape.as_ref().map(|s| s.size()) != Some(m) {
            self.shape = Some((self.window)(m));
        }
        if let Some(shape) = &self.shape {
            shape.apply(&mut self.pre);
        }

        // first half at the start, second half wrapped to the end
        let head = (m + 1) / 2;
        for v in &mut self.spectrum {
            *v = ZERO;
        }
        for (i, &v) in self.pre.iter().enumerate() {
            let at = if i < head { i } else { frame - (m - i) };
            self.spectrum[at] = Complex::new(v, 0.0);
        }

        let fwd = self.plans.forward(frame);
        fit_scratch(&mut self.scratch, &fwd);
        fwd.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let half = self.half_band(bandwidth);
        let gain = 1.0 / frame as f32;
        self.line[0] = self.spectrum[0] * gain;
        for k in 1 ..= half {
            self.line[k] = self.spectrum[k] * gain;
            self.line[w - k] = self.spectrum[frame - k] * gain;
        }

        let inv = self.plans.inverse(w);
        fit_scratch(&mut self.scratch, &inv);
        inv.process_with_scratch(&mut self.line, &mut self.scratch);
        &mut self.line
    }
}

/// History of the last `lines` resampled lines, oldest first when read back.
#[derive(Debug, Clone)]
pub struct ScanRing {
    width: usize,
    lines: usize,
    data: Vec<Complex<f32>>,
    cursor: usize,
}

impl ScanRing {
    pub fn new(width: usize, lines: usize) -> ScanRing {
        let lines = lines.max(1);
        ScanRing {
            width,
            lines,
            data: vec![ZERO; width * lines],
            cursor: 0,
        }
    }

    pub fn width(&self) -> usize { self.width }
    pub fn lines(&self) -> usize { self.lines }

    /// Reallocates (and clears) when the geometry actually changes.
    pub fn reshape(&mut self, width: usize, lines: usize) {
        if width != self.width || lines.max(1) != self.lines {
            *self = ScanRing::new(width, lines);
        }
    }

    /// Overwrites the oldest line. `line` is truncated or zero-padded to the ring width.
    pub fn push(&mut self, line: &[Complex<f32>]) {
        let w = self.width;
        let dst = &mut self.data[self.cursor * w .. (self.cursor + 1) * w];
        let n = line.len().min(w);
        dst[.. n].copy_from_slice(&line[.. n]);
        for v in &mut dst[n ..] {
            *v = ZERO;
        }
        self.cursor = (self.cursor + 1) % self.lines;
    }

    /// The ring rotated so it starts at the oldest line: `(older, newer)` blocks.
    pub fn ordered(&self) -> (&[Complex<f32>], &[Complex<f32>]) {
        let split = self.cursor * self.width;
        (&self.data[split ..], &self.data[.. split])
    }

    /// Line `i` in chronological order, 0 being the oldest.
    pub fn line(&self, i: usize) -> &[Complex<f32>] {
        let row = (self.cursor + i) % self.lines;
        &self.data[row * self.width .. (row + 1) * self.width]
    }
}

/// Square 2D transform whose row passes run on a fixed worker pool.
pub struct Plane {
    size: usize,
    data: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    fft: Arc<dyn Fft<f32>>,
    pool: rayon::ThreadPool,
}

impl Plane {
    pub fn new(size: usize, threads: usize) -> Result<Plane, Error> {
        if size == 0 {
            return Err(Error::EmptySurface(size, size));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("plane-{}", i))
            .build()?;
        let fft = FftPlanner::new().plan_fft_forward(size);
        Ok(Plane {
            size,
            data: vec![ZERO; size * size],
            scratch: vec![ZERO; size * size],
            fft,
            pool,
        })
    }

    pub fn size(&self) -> usize { self.size }

    pub fn resize(&mut self, size: usize) -> Result<(), Error> {
        if size == 0 {
            return Err(Error::EmptySurface(size, size));
        }
        self.size = size;
        self.data = vec![ZERO; size * size];
        self.scratch = vec![ZERO; size * size];
        self.fft = FftPlanner::new().plan_fft_forward(size);
        Ok(())
    }

    /// Places the ring's lines, oldest first, in rows starting at `size/2 - lines/2`,
    /// with the half-plane recentring applied on both axes.
    pub fn load(&mut self, ring: &ScanRing) {
        let size = self.size;
        let half = size / 2;
        for v in &mut self.data {
            *v = ZERO;
        }
        let lines = ring.lines().min(size);
        let width = ring.width().min(size);
        let top = half - lines / 2;
        let (older, newer) = ring.ordered();
        let rows = older.chunks(ring.width()).chain(newer.chunks(ring.width()));
        for (i, line) in rows.take(lines).enumerate() {
            let row = (top + i + half) % size;
            let dst = &mut self.data[row * size .. (row + 1) * size];
            for (c, &v) in line[.. width].iter().enumerate() {
                dst[(c + half) % size] = v;
            }
        }
    }

    /// Forward 2D transform in place, every bin multiplied by `norm`.
    pub fn transform(&mut self, norm: f32) {
        let _g = hprof::enter("Plane::transform");
        let Plane { size, data, scratch, fft, pool } = self;
        let size = *size;
        pool.install(|| {
            rows(data, size, fft);
            transpose(data, scratch, size);
            rows(scratch, size, fft);
            transpose(scratch, data, size);
        });
        for v in data.iter_mut() {
            *v *= norm;
        }
    }

    pub fn bins(&self) -> &[Complex<f32>] { &self.data }

    pub fn bin(&self, x: usize, y: usize) -> Complex<f32> {
        self.data[y * self.size + x]
    }

    /// `(x, y)` of the bin with the largest magnitude.
    pub fn peak(&self) -> (usize, usize) {
        let mut best = 0;
        let mut best_mag = f32::NEG_INFINITY;
        for (i, v) in self.data.iter().enumerate() {
            let mag = v.norm_sqr();
            if mag > best_mag {
                best = i;
                best_mag = mag;
            }
        }
        (best % self.size, best / self.size)
    }
}

fn rows(buf: &mut [Complex<f32>], size: usize, fft: &Arc<dyn Fft<f32>>) {
    let scratch_len = fft.get_inplace_scratch_len();
    buf.par_chunks_mut(size).for_each_init(
        || vec![ZERO; scratch_len],
        |scratch, row| fft.process_with_scratch(row, scratch),
    );
}

fn transpose(src: &[Complex<f32>], dst: &mut [Complex<f32>], size: usize) {
    for r in 0 .. size {
        for c in 0 .. size {
            dst[c * size + r] = src[r * size + c];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::new_rect;
    use rustfft::Length;
    use std::f32::consts::PI;

    fn sine(len: usize, period: usize, amp: f32) -> Vec<i16> {
        (0 .. len)
            .map(|n| (amp * 32767.0 * (2.0 * PI * n as f32 / period as f32).sin()).round() as i16)
            .collect()
    }

    #[test]
    fn test_analytic_of_sine_is_quadrature_pair() {
        let samples = sine(256, 64, 0.5);
        let mut analytic = Analytic::new(256);
        let signal = analytic.process(&samples, 1.0);
        assert_eq!(signal.len(), 256);
        for (n, z) in signal.iter().enumerate() {
            let x = samples[n] as f32 / FULL_SCALE;
            assert!((z.re - x / 2.0).abs() < 1e-3, "re at {}: {} vs {}", n, z.re, x / 2.0);
            assert!((z.norm() - 0.25).abs() < 1e-3, "norm at {}: {}", n, z.norm());
        }
    }

    #[test]
    fn test_analytic_scale_and_short_frames() {
        let samples = sine(100, 20, 0.5);
        let mut analytic = Analytic::new(4096);
        let signal = analytic.process(&samples, 2.0);
        assert_eq!(signal.len(), 100);
        assert!((signal[37].norm() - 0.5).abs() < 1e-2);
        assert!(analytic.process(&[], 1.0).is_empty());
    }

    #[test]
    fn test_resampler_keeps_amplitude() {
        let frame = 4096;
        // bin 8 of the frame spectrum
        let samples = sine(frame, frame / 8, 0.5);
        let mut resampler = Resampler::new(frame, 64, new_rect);
        let line = resampler.process(&samples, 32);
        let peak = line.iter().map(|z| z.re.abs()).fold(0.0f32, f32::max);
        assert!((peak - 0.5).abs() < 0.01, "peak {}", peak);
        assert!(line.iter().all(|z| z.im.abs() < 1e-3));
        // eight cycles across the line
        let crossings = line.windows(2).filter(|p| p[0].re < 0.0 && p[1].re >= 0.0).count();
        assert!((7 ..= 8).contains(&crossings), "crossings {}", crossings);
    }

    #[test]
    fn test_resampler_drops_out_of_band() {
        let frame = 4096;
        // bin 64, well above the 15 bins kept each side
        let samples = sine(frame, frame / 64, 0.5);
        let mut resampler = Resampler::new(frame, 64, new_rect);
        let line = resampler.process(&samples, 32);
        assert!(line.iter().all(|z| z.norm() < 1e-3));
    }

    #[test]
    fn test_resampler_short_frame_keeps_amplitude() {
        // bin 8 of a 1024 frame, only a quarter of it captured
        let samples = sine(256, 128, 0.5);
        let mut resampler = Resampler::new(1024, 64, new_rect);
        let line = resampler.process(&samples, 48);
        let peak = line.iter().map(|z| z.re.abs()).fold(0.0f32, f32::max);
        assert!((peak - 0.5).abs() < 0.05, "peak {}", peak);
        assert!(line.iter().all(|z| z.im.abs() < 1e-3));
        // the captured quarter sits around sample 0; the far side stays quiet
        assert!(line[24 .. 40].iter().all(|z| z.norm() < 0.05));
    }

    #[test]
    fn test_resampler_even_bandwidth_stays_real() {
        let frame = 1024;
        // bin 11, the highest kept with 24 bins
        let samples: Vec<i16> = (0 .. frame)
            .map(|n| (0.5 * 32767.0 * (2.0 * PI * 11.0 * n as f32 / frame as f32).sin()).round() as i16)
            .collect();
        let mut resampler = Resampler::new(frame, 32, new_rect);
        let line = resampler.process(&samples, 24);
        let peak = line.iter().map(|z| z.re.abs()).fold(0.0f32, f32::max);
        assert!((peak - 0.5).abs() < 0.02, "peak {}", peak);
        assert!(line.iter().all(|z| z.im.abs() < 1e-3));
    }

    #[test]
    fn test_plan_cache_is_bounded() {
        let mut plans = Plans::default();
        for n in 100 .. 110 {
            assert_eq!(plans.forward(n).len(), n);
            assert!(plans.forward.len() <= MAX_PLANS);
        }
        assert!(plans.forward.contains_key(&109));
        plans.inverse(64);
        plans.inverse(64);
        assert_eq!(plans.inverse.len(), 1);
    }

    #[test]
    fn test_resampler_silence_and_empty() {
        let mut resampler = Resampler::new(1024, 32, new_rect);
        assert!(resampler.process(&[0; 1024], 16).iter().all(|z| z.norm() == 0.0));
        assert!(resampler.process(&[], 16).iter().all(|z| z.norm() == 0.0));
    }

    #[test]
    fn test_scan_ring_rotation() {
        let mut ring = ScanRing::new(2, 3);
        for k in 1 ..= 4 {
            let v = Complex::new(k as f32, 0.0);
            ring.push(&[v, v]);
        }
        // holds lines 2, 3, 4, oldest first
        assert_eq!(ring.line(0)[0].re, 2.0);
        assert_eq!(ring.line(1)[0].re, 3.0);
        assert_eq!(ring.line(2)[0].re, 4.0);
        let (older, newer) = ring.ordered();
        let flat: Vec<f32> = older.iter().chain(newer).map(|z| z.re).collect();
        assert_eq!(flat, vec![2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn test_plane_of_constant_rows_peaks_at_dc_row() {
        let size = 16;
        let mut ring = ScanRing::new(size, 4);
        let line: Vec<Complex<f32>> = (0 .. size)
            .map(|c| Complex::new((2.0 * PI * 3.0 * c as f32 / size as f32).cos(), 0.0))
            .collect();
        for _ in 0 .. 4 {
            ring.push(&line);
        }
        let mut plane = Plane::new(size, 2).unwrap();
        plane.load(&ring);
        plane.transform(1.0 / (4 * size) as f32);
        let (x, y) = plane.peak();
        assert!(x == 3 || x == size - 3, "x {}", x);
        assert_eq!(y, 0);
        assert!((plane.bin(x, y).norm() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_plane_rejects_empty() {
        assert!(Plane::new(0, 2).is_err());
    }
}
