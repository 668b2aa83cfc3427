use std::collections::HashMap;
use std::f32::consts::PI;

pub trait Window: Send {
    fn size(&self) -> usize;
    fn shape(&self) -> &[f32];

    fn apply(&self, data: &mut [f32]) {
        let shp = self.shape();
        assert_eq!(shp.len(), data.len());
        for (datum, factor) in data.iter_mut().zip(shp.iter()) {
            *datum *= factor;
        }
    }
}

pub type WindowFn = fn(usize) -> Box<dyn Window>;

pub struct GenericWindow(Vec<f32>);

impl Window for GenericWindow {
    fn size(&self) -> usize { self.0.len() }
    fn shape(&self) -> &[f32] { &self.0 }
}

pub fn new_rect(sz: usize) -> Box<dyn Window> {
    Box::new(GenericWindow(vec![1.0f32; sz]))
}

pub fn new_hann(sz: usize) -> Box<dyn Window> {
    if sz < 2 {
        return new_rect(sz);
    }
    let denom = (sz - 1) as f32;
    Box::new(GenericWindow(
        (0 .. sz).map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / denom).cos()).collect()
    ))
}

pub fn windows() -> HashMap<String, WindowFn> {
    let mut map: HashMap<String, WindowFn> = HashMap::new();
    map.insert("rect".into(), new_rect);
    map.insert("hann".into(), new_hann);
    map
}
