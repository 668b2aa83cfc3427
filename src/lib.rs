//! Phosphor-style audio scopes: an analytic-signal (Hilbert) scatter and a 2D
//! spectrum waterfall, both drawn into a decaying persistence grid.

pub mod error;
pub mod fifo;
pub mod params;
pub mod persist;
pub mod project;
pub mod sample;
pub mod sched;
pub mod spectral;
pub mod trigger;
pub mod view;
pub mod window;

pub use error::Error;
pub use params::{Decay, Param, Params};
pub use persist::{PersistenceBuffer, Pixmap};
pub use sample::SampleBuffer;
pub use sched::{Batch, FrameScheduler, Setup, Stats};
pub use view::{Geometry, Mode, View};
