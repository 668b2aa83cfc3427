use super::{tail, Geometry, Mode, View};

use crate::error::Error;
use crate::params::{Param, Params};
use crate::project::{self, Blend, Layer};
use crate::spectral::Analytic;
use crate::trigger::{self, Trigger};

/// Analytic-signal polar scatter: the trace of `x + i·H(x)`, triggered and
/// rotated so each frame starts at the same phase.
pub struct Scatter {
    geom: Geometry,
    params: Params,
    analytic: Analytic,
    layer: Layer,
    last: Option<Trigger>,
}

impl Scatter {
    pub fn new(geom: Geometry) -> Result<Scatter, Error> {
        geom.check()?;
        Ok(Scatter {
            geom,
            params: Params::scatter(),
            analytic: Analytic::new(geom.frame),
            layer: Layer::new(geom.width, geom.height, Blend::Add),
            last: None,
        })
    }

    /// Trigger found by the most recent pass.
    pub fn last_trigger(&self) -> Option<Trigger> {
        self.last
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }
}

impl View for Scatter {
    fn process(&mut self, samples: &[i16]) -> Option<&Layer> {
        let _g = hprof::enter("Scatter::process");
        let samples = tail(samples, self.geom.frame);
        let signal = self.analytic.process(samples, self.params.scale());
        self.last = trigger::locate(signal, self.params.trigger());
        let trig = self.last?;
        self.layer.clear();
        project::scatter(signal, &trig, &self.params, &mut self.layer);
        Some(&self.layer)
    }

    fn resize(&mut self, width: usize, height: usize) -> Result<(), Error> {
        let geom = Geometry { width, height, ..self.geom };
        geom.check()?;
        self.geom = geom;
        self.layer = Layer::new(width, height, Blend::Add);
        self.last = None;
        Ok(())
    }

    fn adjust(&mut self, param: Param, steps: i32) {
        self.params.adjust(param, steps);
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn status(&self) -> String {
        self.params.status(self.geom.rate, self.geom.frame)
    }

    fn mode(&self) -> Mode {
        Mode::Scatter
    }
}
