//! Drives processing passes and display ticks at independent rates.
//!
//! There are two locks. The [`SampleBuffer`] mutex sits between the capture
//! callback and the analyzer; the core mutex guards the view together with the
//! persistence grid, so accumulate, decay, composite and reallocation never
//! interleave. The per-batch and per-tick paths only `try_lock` and give up on
//! contention. `resize` and `adjust` block on the core lock; `resize` then
//! takes the sample lock to reallocate it.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::Error;
use crate::params::Param;
use crate::persist::{PersistenceBuffer, Pixmap};
use crate::sample::SampleBuffer;
use crate::view::{Geometry, Mode, View};
use crate::window::{new_rect, WindowFn};

/// Fixed configuration of a scheduler.
#[derive(Clone, Copy)]
pub struct Setup {
    pub mode: Mode,
    pub frame: usize,
    pub rate: f64,
    /// Surface pixels per persistence cell along each axis.
    pub pixel_scale: usize,
    pub threads: usize,
    pub window: WindowFn,
}

impl Default for Setup {
    fn default() -> Setup {
        Setup {
            mode: Mode::Scatter,
            frame: 4096,
            rate: 48000.0,
            pixel_scale: 2,
            threads: 2,
            window: new_rect,
        }
    }
}

/// Outcome of one sample batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Batch {
    /// A new layer was merged into persistence.
    Rendered,
    /// The pass ran but had nothing to draw; persistence only decayed.
    Idle,
    /// A lock was held; the batch was discarded.
    Dropped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub rendered: u64,
    pub idle: u64,
    pub dropped: u64,
    pub stale: u64,
}

#[derive(Default)]
struct Counters {
    rendered: AtomicU64,
    idle: AtomicU64,
    dropped: AtomicU64,
    stale: AtomicU64,
}

struct Core {
    view: Box<dyn View>,
    persistence: PersistenceBuffer,
    scratch: Vec<i16>,
}

pub struct FrameScheduler {
    samples: SampleBuffer,
    core: Mutex<Core>,
    setup: Setup,
    counters: Counters,
}

impl FrameScheduler {
    /// A scheduler for a surface of `width` x `height` pixels.
    pub fn new(setup: Setup, width: usize, height: usize) -> Result<FrameScheduler, Error> {
        let (gw, gh) = grid_for(&setup, width, height)?;
        let view = setup.mode.build(Geometry {
            frame: setup.frame,
            rate: setup.rate,
            width: gw,
            height: gh,
            threads: setup.threads,
            window: setup.window,
        })?;
        log::info!("{} scope on a {}x{} grid, frame {}", setup.mode, gw, gh, setup.frame);
        Ok(FrameScheduler {
            samples: SampleBuffer::new(setup.frame),
            core: Mutex::new(Core {
                view,
                persistence: PersistenceBuffer::new(gw, gh),
                scratch: Vec::with_capacity(setup.frame),
            }),
            setup,
            counters: Counters::default(),
        })
    }

    pub fn setup(&self) -> &Setup {
        &self.setup
    }

    /// Stores `samples` and runs one processing pass over the newest frame.
    pub fn on_batch(&self, samples: &[i16]) -> Batch {
        let _g = hprof::enter("FrameScheduler::on_batch");
        if !self.samples.write(samples) {
            return self.drop_batch("sample buffer busy");
        }
        let mut core = match self.core.try_lock() {
            Some(core) => core,
            None => return self.drop_batch("pass in flight"),
        };
        let Core { view, persistence, scratch } = &mut *core;
        if !self.samples.read_into(scratch) {
            return self.drop_batch("sample buffer busy");
        }

        let rendered = match view.process(scratch) {
            Some(layer) => persistence.accumulate(layer),
            None => false,
        };
        persistence.decay(&view.params().decay());

        if rendered {
            self.counters.rendered.fetch_add(1, Ordering::Relaxed);
            Batch::Rendered
        } else {
            self.counters.idle.fetch_add(1, Ordering::Relaxed);
            Batch::Idle
        }
    }

    fn drop_batch(&self, why: &str) -> Batch {
        log::trace!("dropped batch: {}", why);
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        Batch::Dropped
    }

    /// Composites persistence into `out`. On contention `out` is left as it was
    /// (the previous frame) and false returned.
    pub fn on_tick(&self, out: &mut Pixmap) -> bool {
        let _g = hprof::enter("FrameScheduler::on_tick");
        match self.core.try_lock() {
            Some(core) => {
                core.persistence.composite(out);
                true
            }
            None => {
                log::trace!("stale tick");
                self.counters.stale.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Reallocates everything sized by the surface, and the sample buffer with
    /// it. Nothing drawn or captured before survives.
    pub fn resize(&self, width: usize, height: usize) -> Result<(), Error> {
        let (gw, gh) = grid_for(&self.setup, width, height)?;
        let mut core = self.core.lock();
        core.view.resize(gw, gh)?;
        core.persistence.resize(gw, gh);
        self.samples.resize(self.setup.frame);
        log::debug!("resized to {}x{} ({}x{} grid)", width, height, gw, gh);
        Ok(())
    }

    /// Applies a parameter delta and returns the new status line.
    pub fn adjust(&self, param: Param, steps: i32) -> String {
        let mut core = self.core.lock();
        core.view.adjust(param, steps);
        let status = core.view.status();
        log::debug!("{:?} {:+}: {}", param, steps, status);
        status
    }

    pub fn status(&self) -> String {
        self.core.lock().view.status()
    }

    pub fn mode(&self) -> Mode {
        self.setup.mode
    }

    /// Current persistence grid dimensions.
    pub fn grid(&self) -> (usize, usize) {
        let core = self.core.lock();
        (core.persistence.width(), core.persistence.height())
    }

    pub fn stats(&self) -> Stats {
        Stats {
            rendered: self.counters.rendered.load(Ordering::Relaxed),
            idle: self.counters.idle.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            stale: self.counters.stale.load(Ordering::Relaxed),
        }
    }
}

/// Persistence grid for a surface, at least one cell per axis.
fn grid_for(setup: &Setup, width: usize, height: usize) -> Result<(usize, usize), Error> {
    if setup.frame == 0 {
        return Err(Error::EmptyFrame);
    }
    if width == 0 || height == 0 {
        return Err(Error::EmptySurface(width, height));
    }
    let scale = setup.pixel_scale.max(1);
    Ok(((width / scale).max(1), (height / scale).max(1)))
}
