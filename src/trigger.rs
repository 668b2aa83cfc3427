//! Synchronization points that keep successive frames phase-aligned.

use rustfft::num_complex::Complex;

/// A rising-edge trigger in an analytic signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    pub index: usize,
    /// Unit-magnitude factor rotating the trigger sample onto the positive real axis.
    pub rotation: Complex<f32>,
}

impl Trigger {
    /// Position of sample `n` along the trace, as a fraction of `len`, counted from the trigger.
    pub fn ramp(&self, n: usize, len: usize) -> f32 {
        if len == 0 {
            return 0.0;
        }
        ((n + len - self.index % len) % len) as f32 / len as f32
    }
}

/// First `n >= 1` with `re(signal[n]) >= level > re(signal[n-1])`.
pub fn locate(signal: &[Complex<f32>], level: f32) -> Option<Trigger> {
    let index = signal
        .windows(2)
        .position(|pair| pair[0].re < level && pair[1].re >= level)?
        + 1;
    let z = signal[index];
    let mag = z.norm();
    let rotation = if mag > 0.0 {
        z.conj() / mag
    } else {
        Complex::new(1.0, 0.0)
    };
    Some(Trigger { index, rotation })
}

/// Phase of `z`. A real-valued sample carrying rounding noise in its imaginary
/// part is snapped to 0 when positive and to -pi when negative, so only the
/// positive half of a real line counts as non-negative phase.
fn phase(z: Complex<f32>) -> f32 {
    if z.im.abs() <= 1e-6 * z.re.abs() {
        if z.re < 0.0 { -std::f32::consts::PI } else { 0.0 }
    } else {
        z.arg()
    }
}

fn armed(z: Complex<f32>, level: f32) -> bool {
    z.norm().log10() >= level && phase(z) >= 0.0
}

/// First `m` where the magnitude reaches `10^level` with non-negative phase.
/// A line already armed at sample 0 triggers there and is left in place.
pub fn locate_line(line: &[Complex<f32>], level: f32) -> Option<usize> {
    line.iter().position(|&z| armed(z, level))
}

/// Shifts `line` left so its trigger lands at index 0, zero-filling the tail.
/// Without a trigger the whole line is silenced.
pub fn align(line: &mut [Complex<f32>], level: f32) -> Option<usize> {
    let zero = Complex::new(0.0, 0.0);
    match locate_line(line, level) {
        Some(m) => {
            let len = line.len();
            line.copy_within(m .., 0);
            for v in &mut line[len - m ..] {
                *v = zero;
            }
            Some(m)
        }
        None => {
            for v in line.iter_mut() {
                *v = zero;
            }
            None
        }
    }
}
