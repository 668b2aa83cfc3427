use super::{tail, Geometry, Mode, View};

use crate::error::Error;
use crate::params::{Param, Params};
use crate::project::{self, Blend, Layer};
use crate::spectral::{Plane, Resampler, ScanRing};
use crate::trigger;

/// Square plane side for a grid: the longer side, rounded up to even.
pub fn plane_size(width: usize, height: usize) -> usize {
    let side = width.max(height);
    side + side % 2
}

/// 2D spectrogram of the most recent scan lines: one axis time, one frequency,
/// phase as hue and log magnitude as brightness.
pub struct Spectrum {
    geom: Geometry,
    params: Params,
    resampler: Resampler,
    ring: ScanRing,
    plane: Plane,
    layer: Layer,
    last: Option<usize>,
}

impl Spectrum {
    pub fn new(geom: Geometry) -> Result<Spectrum, Error> {
        geom.check()?;
        let size = plane_size(geom.width, geom.height);
        let params = Params::spectrum(size as u32);
        Ok(Spectrum {
            geom,
            resampler: Resampler::new(geom.frame, size, geom.window),
            ring: ScanRing::new(size, params.scan_lines() as usize),
            plane: Plane::new(size, geom.threads)?,
            layer: Layer::new(geom.width, geom.height, Blend::Lighten),
            params,
            last: None,
        })
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn ring(&self) -> &ScanRing {
        &self.ring
    }

    /// Trigger offset applied to the most recent line.
    pub fn last_trigger(&self) -> Option<usize> {
        self.last
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    fn sync_ring(&mut self) {
        self.ring.reshape(self.plane.size(), self.params.scan_lines() as usize);
    }
}

impl View for Spectrum {
    fn process(&mut self, samples: &[i16]) -> Option<&Layer> {
        let _g = hprof::enter("Spectrum::process");
        if samples.is_empty() {
            return None;
        }
        self.sync_ring();
        let samples = tail(samples, self.geom.frame);
        let line = self.resampler.process(samples, self.params.bandwidth() as usize);
        self.last = trigger::align(line, self.params.trigger());
        self.ring.push(line);

        self.plane.load(&self.ring);
        let norm = 1.0 / (self.ring.lines() * self.plane.size()) as f32;
        self.plane.transform(norm);

        self.layer.clear();
        project::spectrogram(&self.plane, &self.params, &mut self.layer);
        Some(&self.layer)
    }

    fn resize(&mut self, width: usize, height: usize) -> Result<(), Error> {
        let geom = Geometry { width, height, ..self.geom };
        geom.check()?;
        let size = plane_size(width, height);
        self.plane.resize(size)?;
        self.resampler.resize(size);
        self.params.set_span(size as u32);
        self.ring = ScanRing::new(size, self.params.scan_lines() as usize);
        self.layer = Layer::new(width, height, Blend::Lighten);
        self.geom = geom;
        self.last = None;
        log::debug!("spectrum plane {}x{} for grid {}x{}", size, size, width, height);
        Ok(())
    }

    fn adjust(&mut self, param: Param, steps: i32) {
        self.params.adjust(param, steps);
        self.sync_ring();
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn status(&self) -> String {
        self.params.status(self.geom.rate, self.geom.frame)
    }

    fn mode(&self) -> Mode {
        Mode::Spectrum
    }
}
