//! Runtime-adjustable scope parameters.
//!
//! Every scope instance owns one [`Params`]. Input handling never writes the
//! fields directly; it sends [`Param`] deltas through the owning view, and each
//! setter clamps to the range for that parameter.

use std::fmt;

/// Values below this are flushed to zero by multiplicative decay.
pub const DECAY_FLOOR: f32 = 1.0 / 1024.0;

const SUBTRACT_STEP: f32 = 4.0 / 255.0;

/// How one persistence channel fades between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decay {
    /// `v *= factor`, factor in (0, 1].
    Multiply(f32),
    /// `v = max(0, v - step)`.
    Subtract(f32),
}

impl Decay {
    pub fn apply(self, v: f32) -> f32 {
        match self {
            Decay::Multiply(f) => {
                let v = v * f;
                if v < DECAY_FLOOR { 0.0 } else { v }
            }
            Decay::Subtract(s) => (v - s).max(0.0),
        }
    }

    fn nudge(self, steps: i32) -> Decay {
        match self {
            Decay::Multiply(f) => Decay::multiply(f + 0.01 * steps as f32),
            Decay::Subtract(s) => Decay::subtract(s + SUBTRACT_STEP * steps as f32),
        }
    }

    pub fn multiply(f: f32) -> Decay {
        Decay::Multiply(f.clamp(0.001, 1.0))
    }

    pub fn subtract(s: f32) -> Decay {
        Decay::Subtract(s.clamp(1.0 / 255.0, 128.0 / 255.0))
    }
}

impl fmt::Display for Decay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decay::Multiply(v) => write!(f, "x{:.3}", v),
            Decay::Subtract(s) => write!(f, "-{:.0}", s * 255.0),
        }
    }
}

/// A parameter the input collaborator can nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Trigger,
    Scale,
    Offset,
    Saturation,
    Red,
    Green,
    Blue,
    Bleed,
    ScanLines,
    Bandwidth,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Scatter,
    Spectrum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    kind: Kind,
    trigger: f32,
    scale: f32,
    offset: f32,
    saturation: f32,
    decay: [Decay; 3],
    bleed: u32,
    scan_lines: u32,
    bandwidth: u32,
    span: u32,
}

impl Params {
    pub fn scatter() -> Params {
        Params {
            kind: Kind::Scatter,
            trigger: 0.0,
            scale: 1.0,
            offset: 0.0,
            saturation: 0.0,
            decay: [
                Decay::Multiply(0.6667),
                Decay::Subtract(SUBTRACT_STEP),
                Decay::Multiply(0.75),
            ],
            bleed: 16,
            scan_lines: 1,
            bandwidth: 1,
            span: 1,
        }
    }

    /// Spectrum defaults for a plane `span` bins wide.
    pub fn spectrum(span: u32) -> Params {
        let span = span.max(1);
        Params {
            kind: Kind::Spectrum,
            trigger: -1.0,
            scale: 1.0,
            offset: 1.0,
            saturation: 0.5,
            decay: [Decay::Multiply(0.5); 3],
            bleed: 16,
            scan_lines: (span / 4).max(1),
            bandwidth: (3 * span / 4).max(1),
            span,
        }
    }

    pub fn trigger(&self) -> f32 { self.trigger }
    pub fn scale(&self) -> f32 { self.scale }
    pub fn offset(&self) -> f32 { self.offset }
    pub fn saturation(&self) -> f32 { self.saturation }
    pub fn decay(&self) -> [Decay; 3] { self.decay }
    pub fn bleed(&self) -> u32 { self.bleed }
    pub fn scan_lines(&self) -> u32 { self.scan_lines }
    pub fn bandwidth(&self) -> u32 { self.bandwidth }
    pub fn span(&self) -> u32 { self.span }

    /// Pixel radius of the bleed glow around a plotted point.
    pub fn bleed_radius(&self) -> u32 { 256 / self.bleed }

    pub fn set_trigger(&mut self, level: f32) {
        self.trigger = match self.kind {
            Kind::Scatter => level.clamp(-1.0, 1.0),
            Kind::Spectrum => level.clamp(-6.0, 2.0),
        };
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale.clamp(0.001, 1024.0);
    }

    pub fn set_offset(&mut self, offset: f32) {
        self.offset = offset.clamp(-10.0, 10.0);
    }

    pub fn set_saturation(&mut self, sat: f32) {
        self.saturation = sat.clamp(0.0, 1.0);
    }

    /// Replaces the decay law of channel `chan` (0 red, 1 green, 2 blue).
    /// Any other channel is ignored.
    pub fn set_decay(&mut self, chan: usize, decay: Decay) {
        if let Some(slot) = self.decay.get_mut(chan) {
            *slot = match decay {
                Decay::Multiply(f) => Decay::multiply(f),
                Decay::Subtract(s) => Decay::subtract(s),
            };
        }
    }

    pub fn set_bleed(&mut self, bleed: u32) {
        self.bleed = bleed.clamp(1, 128);
    }

    pub fn set_scan_lines(&mut self, lines: u32) {
        self.scan_lines = lines.clamp(1, self.span);
    }

    pub fn set_bandwidth(&mut self, bins: u32) {
        self.bandwidth = bins.clamp(1, self.span);
    }

    /// Changes the plane width and re-clamps what depends on it.
    pub fn set_span(&mut self, span: u32) {
        self.span = span.max(1);
        self.set_scan_lines(self.scan_lines);
        self.set_bandwidth(self.bandwidth);
    }

    pub fn adjust(&mut self, param: Param, steps: i32) {
        let fsteps = steps as f32;
        match param {
            Param::Trigger => self.set_trigger(self.trigger + 0.01 * fsteps),
            Param::Scale => self.set_scale(self.scale * 1.05f32.powi(steps)),
            Param::Offset => self.set_offset(self.offset + 0.01 * fsteps),
            Param::Saturation => self.set_saturation(self.saturation + 0.01 * fsteps),
            Param::Red => self.decay[0] = self.decay[0].nudge(steps),
            Param::Green => self.decay[1] = self.decay[1].nudge(steps),
            Param::Blue => self.decay[2] = self.decay[2].nudge(steps),
            Param::Bleed => self.set_bleed((self.bleed as i64 + 4 * steps as i64).max(0) as u32),
            Param::ScanLines => {
                self.set_scan_lines((self.scan_lines as i64 + steps as i64).max(0) as u32)
            }
            Param::Bandwidth => {
                self.set_bandwidth((self.bandwidth as i64 + steps as i64).max(0) as u32)
            }
        }
    }

    /// Title text for the host window. `rate` is in Hz, `frame` in samples.
    pub fn status(&self, rate: f64, frame: usize) -> String {
        match self.kind {
            Kind::Scatter => format!(
                "[Trigger: {:.2}] [Scale: {:.3}] [R: {} G: {} B: {}] [Bleed: {}]",
                self.trigger, self.scale, self.decay[0], self.decay[1], self.decay[2], self.bleed
            ),
            Kind::Spectrum => {
                let frame = frame.max(1) as f64;
                let df = self.bandwidth as f64 * rate / frame;
                let dt = self.scan_lines as f64 * frame * 1000.0 / rate.max(1.0);
                format!(
                    "[\u{394}f (H): {} Hz] [\u{394}T (V): {} ms] [Trigger: {:.1} dB] [Scale: {:.1} dB]",
                    df as i64,
                    dt as i64,
                    self.trigger * 10.0,
                    self.offset * 10.0
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplicative_decay_follows_power_law() {
        let law = Decay::Multiply(0.5);
        let mut v = 1.0f32;
        for k in 1 ..= 5 {
            let next = law.apply(v);
            assert!(next <= v);
            v = next;
            assert!((v - 0.5f32.powi(k)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_multiplicative_decay_flushes_to_zero() {
        let law = Decay::Multiply(0.9);
        let mut v = 1.0f32;
        let mut k = 0;
        while v > 0.0 {
            v = law.apply(v);
            assert!(v >= 0.0);
            k += 1;
            assert!(k < 1000);
        }
        // 0.9^k < 1/1024 first at k = 66
        assert_eq!(k, 66);
    }

    #[test]
    fn test_subtractive_decay_reaches_zero_and_stays() {
        let law = Decay::Subtract(0.3);
        assert!((law.apply(1.0) - 0.7).abs() < 1e-6);
        let mut v = 1.0f32;
        for _ in 0 .. 4 {
            v = law.apply(v);
        }
        assert_eq!(v, 0.0);
        assert_eq!(law.apply(v), 0.0);
    }

    #[test]
    fn test_adjust_clamps() {
        let mut params = Params::scatter();
        params.adjust(Param::Trigger, 500);
        assert_eq!(params.trigger(), 1.0);
        params.adjust(Param::Scale, -1000);
        assert_eq!(params.scale(), 0.001);
        params.adjust(Param::Red, 100);
        assert_eq!(params.decay()[0], Decay::Multiply(1.0));
        params.adjust(Param::Green, -100);
        assert_eq!(params.decay()[1], Decay::Subtract(1.0 / 255.0));
        params.adjust(Param::Bleed, -100);
        assert_eq!(params.bleed(), 1);
        assert_eq!(params.bleed_radius(), 256);
    }

    #[test]
    fn test_set_decay_clamps_and_ignores_bad_channel() {
        let mut params = Params::scatter();
        params.set_decay(2, Decay::Subtract(1.0));
        assert_eq!(params.decay()[2], Decay::Subtract(128.0 / 255.0));
        let before = params.decay();
        params.set_decay(3, Decay::Multiply(0.5));
        assert_eq!(params.decay(), before);
    }

    #[test]
    fn test_spectrum_span_reclamps() {
        let mut params = Params::spectrum(300);
        assert_eq!(params.scan_lines(), 75);
        assert_eq!(params.bandwidth(), 225);
        params.set_span(100);
        assert_eq!(params.scan_lines(), 75);
        assert_eq!(params.bandwidth(), 100);
        params.adjust(Param::ScanLines, -500);
        assert_eq!(params.scan_lines(), 1);
    }

    #[test]
    fn test_spectrum_status() {
        let params = Params::spectrum(300);
        let status = params.status(48000.0, 4096);
        assert!(status.contains("2636 Hz"), "{}", status);
        assert!(status.contains("6400 ms"), "{}", status);
    }
}
