//! Phosphor-style persistence grid.

use crate::params::Decay;
use crate::project::{Blend, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Empty,
    Populated,
}

/// Packed RGB24 image handed to the rendering surface.
#[derive(Debug, Clone, Default)]
pub struct Pixmap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Pixmap {
    pub fn pitch(&self) -> usize { self.width * 3 }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

fn unit(v: f32) -> f32 {
    if v > 0.0 { v.min(1.0) } else { 0.0 }
}

/// Three channels per cell, each kept within [0, 1].
#[derive(Debug, Clone)]
pub struct PersistenceBuffer {
    width: usize,
    height: usize,
    cells: Vec<[f32; 3]>,
    state: State,
}

impl PersistenceBuffer {
    pub fn new(width: usize, height: usize) -> PersistenceBuffer {
        PersistenceBuffer {
            width,
            height,
            cells: vec![[0.0; 3]; width * height],
            state: State::Empty,
        }
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn state(&self) -> State { self.state }
    pub fn cells(&self) -> &[[f32; 3]] { &self.cells }

    pub fn get(&self, x: usize, y: usize) -> [f32; 3] {
        self.cells[y * self.width + x]
    }

    /// Fresh zeroed storage; nothing survives a resize.
    pub fn resize(&mut self, width: usize, height: usize) {
        *self = PersistenceBuffer::new(width, height);
    }

    /// Merges a frame layer. A layer for different dimensions (left over from
    /// before a resize) is ignored and false returned.
    pub fn accumulate(&mut self, layer: &Layer) -> bool {
        if layer.width() != self.width || layer.height() != self.height {
            return false;
        }
        let _g = hprof::enter("PersistenceBuffer::accumulate");
        let blend = layer.blend();
        for (cell, add) in self.cells.iter_mut().zip(layer.cells()) {
            for (c, &a) in cell.iter_mut().zip(add) {
                let a = unit(a);
                *c = match blend {
                    Blend::Add => unit(*c + a),
                    Blend::Lighten => c.max(a),
                };
            }
        }
        self.state = State::Populated;
        true
    }

    /// Applies each channel's decay law once.
    pub fn decay(&mut self, laws: &[Decay; 3]) {
        let _g = hprof::enter("PersistenceBuffer::decay");
        for cell in &mut self.cells {
            for (c, law) in cell.iter_mut().zip(laws) {
                if *c > 0.0 {
                    *c = unit(law.apply(*c));
                }
            }
        }
    }

    pub fn composite(&self, out: &mut Pixmap) {
        let _g = hprof::enter("PersistenceBuffer::composite");
        out.width = self.width;
        out.height = self.height;
        out.data.clear();
        out.data.reserve(self.cells.len() * 3);
        for cell in &self.cells {
            for &c in cell {
                out.data.push((unit(c) * 255.0).round() as u8);
            }
        }
    }

    pub fn is_dark(&self) -> bool {
        self.cells.iter().all(|c| c.iter().all(|&v| v == 0.0))
    }
}
