use std::iter;
use std::ops::{Deref, DerefMut};

/// Sliding window over the most recent `size()` values pushed.
///
/// Until enough data has arrived to fill it, only the tail `filled()` values
/// are real; `recent()` hands out exactly those.
#[derive(Debug, Clone)]
pub struct Fifo<T> {
    buffer: Vec<T>,
    filled: usize,
}

impl<T> Fifo<T> {
    pub fn new(sz: usize) -> Fifo<T> where T: Default + Clone {
        let mut buffer = Vec::with_capacity(sz);
        buffer.extend(iter::repeat(Default::default()).take(sz));
        Fifo { buffer, filled: 0 }
    }

    pub fn push(&mut self, data: &[T]) where T: Copy {
        let dlen = data.len();
        let blen = self.buffer.len();

        if dlen >= blen {
            self.buffer.copy_from_slice(&data[dlen - blen ..]);
        } else {
            self.buffer.copy_within(dlen .., 0);
            (&mut self.buffer[blen - dlen ..]).copy_from_slice(data);
        }
        self.filled = (self.filled + dlen).min(blen);
    }

    pub fn size(&self) -> usize { self.buffer.len() }

    pub fn filled(&self) -> usize { self.filled }

    pub fn recent(&self) -> &[T] {
        &self.buffer[self.buffer.len() - self.filled ..]
    }

    /// Resizing keeps the most recent values and forgets anything that no longer fits.
    pub fn resize(&mut self, newsz: usize) where T: Default + Clone {
        let blen = self.buffer.len();
        if newsz < blen {
            self.buffer.drain(.. blen - newsz);
        } else {
            let grow = newsz - blen;
            self.buffer.splice(0 .. 0, iter::repeat(T::default()).take(grow));
        }
        self.filled = self.filled.min(newsz);
    }
}

impl<T> Deref for Fifo<T> {
    type Target = [T];
    fn deref(&self) -> &[T] { &self.buffer }
}

impl<T> DerefMut for Fifo<T> {
    fn deref_mut(&mut self) -> &mut [T] { &mut self.buffer }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_short_batches_fills_tail() {
        let mut fifo: Fifo<i16> = Fifo::new(6);
        fifo.push(&[1, 2]);
        assert_eq!(fifo.filled(), 2);
        assert_eq!(fifo.recent(), &[1, 2]);
        fifo.push(&[3, 4, 5]);
        assert_eq!(fifo.recent(), &[1, 2, 3, 4, 5]);
        assert_eq!(&fifo[..], &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_push_overflow_keeps_newest() {
        let mut fifo: Fifo<i16> = Fifo::new(4);
        fifo.push(&[1, 2, 3]);
        fifo.push(&[4, 5, 6]);
        assert_eq!(fifo.recent(), &[3, 4, 5, 6]);
        fifo.push(&[7, 8, 9, 10, 11]);
        assert_eq!(fifo.recent(), &[8, 9, 10, 11]);
        assert_eq!(fifo.filled(), 4);
    }

    #[test]
    fn test_resize_keeps_recent() {
        let mut fifo: Fifo<i16> = Fifo::new(4);
        fifo.push(&[1, 2, 3, 4]);
        fifo.resize(2);
        assert_eq!(fifo.recent(), &[3, 4]);
        fifo.resize(5);
        assert_eq!(fifo.size(), 5);
        assert_eq!(fifo.recent(), &[3, 4]);
        assert_eq!(&fifo[..], &[0, 0, 0, 3, 4]);
    }
}
