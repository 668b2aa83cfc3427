pub mod scatter;
pub mod spectrum;

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::params::{Param, Params};
use crate::project::Layer;
use crate::window::WindowFn;

/// What a view needs to know about its input and its grid.
#[derive(Clone, Copy)]
pub struct Geometry {
    /// Frame capacity in samples.
    pub frame: usize,
    /// Capture rate in Hz.
    pub rate: f64,
    /// Grid size in persistence cells.
    pub width: usize,
    pub height: usize,
    /// Workers for the 2D transform.
    pub threads: usize,
    /// Pre-transform window for spectrum mode.
    pub window: WindowFn,
}

impl Geometry {
    fn check(&self) -> Result<(), Error> {
        if self.frame == 0 {
            return Err(Error::EmptyFrame);
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::EmptySurface(self.width, self.height));
        }
        Ok(())
    }
}

pub trait View: Send {
    /// Runs one processing pass. `None` means nothing new to draw this frame
    /// (no trigger, or no samples); persistence still decays.
    fn process(&mut self, samples: &[i16]) -> Option<&Layer>;

    /// Reallocates everything derived from the grid size.
    fn resize(&mut self, width: usize, height: usize) -> Result<(), Error>;

    fn adjust(&mut self, param: Param, steps: i32);

    fn params(&self) -> &Params;

    fn status(&self) -> String;

    fn mode(&self) -> Mode;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Scatter,
    Spectrum,
}

impl Mode {
    pub fn build(self, geom: Geometry) -> Result<Box<dyn View>, Error> {
        Ok(match self {
            Mode::Scatter => Box::new(scatter::Scatter::new(geom)?),
            Mode::Spectrum => Box::new(spectrum::Spectrum::new(geom)?),
        })
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Mode, String> {
        match s {
            "scatter" => Ok(Mode::Scatter),
            "spectrum" => Ok(Mode::Spectrum),
            other => Err(format!("unknown mode {:?}", other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Scatter => "scatter",
            Mode::Spectrum => "spectrum",
        })
    }
}

/// The most recent `frame` samples of a batch.
fn tail(samples: &[i16], frame: usize) -> &[i16] {
    &samples[samples.len() - samples.len().min(frame) ..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::new_rect;

    fn geom(width: usize, height: usize) -> Geometry {
        Geometry { frame: 1024, rate: 48000.0, width, height, threads: 1, window: new_rect }
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("scatter".parse::<Mode>(), Ok(Mode::Scatter));
        assert_eq!("spectrum".parse::<Mode>(), Ok(Mode::Spectrum));
        assert!("vector".parse::<Mode>().is_err());
        assert_eq!(Mode::Spectrum.to_string(), "spectrum");
    }

    #[test]
    fn test_build_checks_geometry() {
        assert!(Mode::Scatter.build(geom(0, 10)).is_err());
        let mut bad = geom(10, 10);
        bad.frame = 0;
        assert!(Mode::Spectrum.build(bad).is_err());
        let view = Mode::Spectrum.build(geom(10, 8)).unwrap();
        assert_eq!(view.mode(), Mode::Spectrum);
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail(&[1, 2, 3, 4], 2), &[3, 4]);
        assert_eq!(tail(&[1, 2], 8), &[1, 2]);
    }
}
