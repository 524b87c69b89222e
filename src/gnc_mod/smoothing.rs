// ---------------------------------------------------------------------------
// Moving-average filter with a hard override
// ---------------------------------------------------------------------------

/// Mean of the last `window` samples.
///
/// `set` pushes one sample into the ring; `force` fills every slot so the
/// value jumps immediately with no blending.
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    samples: Vec<f64>,
    next: usize,
    default_value: f64,
}

impl SmoothedValue {
    /// A window of 0 is treated as 1.
    pub fn new(window: usize, default_value: f64) -> Self {
        Self {
            samples: vec![default_value; window.max(1)],
            next: 0,
            default_value,
        }
    }

    /// Mean taken as offsets from the first slot, so a forced value reads
    /// back exactly.
    pub fn value(&self) -> f64 {
        let base = self.samples[0];
        let offset: f64 = self.samples.iter().map(|s| s - base).sum();
        base + offset / self.samples.len() as f64
    }

    pub fn set(&mut self, sample: f64) {
        self.samples[self.next] = sample;
        self.next = (self.next + 1) % self.samples.len();
    }

    pub fn force(&mut self, value: f64) {
        self.samples.iter_mut().for_each(|s| *s = value);
        self.next = 0;
    }

    /// Back to the construction default.
    pub fn reset(&mut self) {
        self.force(self.default_value);
    }

    pub fn window(&self) -> usize {
        self.samples.len()
    }
}
