//! Handoff of captured samples from the capture thread to the processing pass.

use parking_lot::Mutex;

#[derive(Debug)]
struct Samples {
    data: Vec<i16>,
    len: usize,
}

/// Fixed-capacity sample store shared between the capture callback and the analyzer.
///
/// Both sides only ever `try_lock`: a writer that finds the lock held drops its update
/// and keeps the previous contents, a reader that finds it held skips the pass.
#[derive(Debug)]
pub struct SampleBuffer {
    inner: Mutex<Samples>,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        SampleBuffer {
            inner: Mutex::new(Samples {
                data: vec![0; capacity],
                len: 0,
            }),
        }
    }

    /// Stores the most recent `capacity` samples of `samples`. Returns false if dropped.
    pub fn write(&self, samples: &[i16]) -> bool {
        let mut inner = match self.inner.try_lock() {
            Some(inner) => inner,
            None => return false,
        };
        let cap = inner.data.len();
        let len = samples.len().min(cap);
        inner.data[.. len].copy_from_slice(&samples[samples.len() - len ..]);
        inner.len = len;
        true
    }

    /// Copies the valid region into `out`. Returns false (and leaves `out` alone) on contention.
    pub fn read_into(&self, out: &mut Vec<i16>) -> bool {
        let inner = match self.inner.try_lock() {
            Some(inner) => inner,
            None => return false,
        };
        out.clear();
        out.extend_from_slice(&inner.data[.. inner.len]);
        true
    }

    pub fn read(&self) -> Option<Vec<i16>> {
        let mut out = Vec::new();
        if self.read_into(&mut out) {
            Some(out)
        } else {
            None
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().data.len()
    }

    /// Reallocates the storage; previous contents are discarded.
    pub fn resize(&self, capacity: usize) {
        let mut inner = self.inner.lock();
        inner.data = vec![0; capacity];
        inner.len = 0;
    }
}
