use std::fmt;

/// Construction-time failures. Nothing in the steady-state pipeline returns these.
#[derive(Debug)]
pub enum Error {
    /// Frame capacity of zero samples.
    EmptyFrame,
    /// Surface or grid with a zero dimension.
    EmptySurface(usize, usize),
    /// The 2D transform worker pool could not be started.
    Pool(rayon::ThreadPoolBuildError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyFrame => write!(f, "frame size must be at least one sample"),
            Error::EmptySurface(w, h) => write!(f, "surface {}x{} has no pixels", w, h),
            Error::Pool(err) => write!(f, "starting transform workers: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Pool(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Error::Pool(err)
    }
}
