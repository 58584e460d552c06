// src/tracking/elevation.rs
//! Moving-average altitude smoothing

/// Largest smoothing window supported
pub const ELEVATION_HISTORY_CAPACITY: usize = 5;

/// Fixed-capacity circular buffer. Pushing into a full buffer overwrites
/// the oldest reading.
#[derive(Debug, Clone)]
pub struct RingBuffer<const N: usize> {
    slots: [f64; N],
    head: usize,
    len: usize,
    window: usize,
}

impl<const N: usize> RingBuffer<N> {
    /// Create a buffer that keeps the last `window` readings (clamped to `1..=N`).
    pub fn new(window: usize) -> Self {
        Self {
            slots: [0.0; N],
            head: 0,
            len: 0,
            window: window.clamp(1, N),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.slots[self.head] = value;
        self.head = (self.head + 1) % self.window;
        self.len = (self.len + 1).min(self.window);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.window
    }

    pub fn mean(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        let sum: f64 = self.slots[..self.len].iter().sum();
        Some(sum / self.len as f64)
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

/// Smooths raw altitude readings over the last few samples.
#[derive(Debug, Clone)]
pub struct ElevationSmoother {
    history: RingBuffer<ELEVATION_HISTORY_CAPACITY>,
}

impl ElevationSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            history: RingBuffer::new(window),
        }
    }

    /// Record a raw altitude and return the current moving average.
    ///
    /// Returns `None` when the reading is absent or non-finite; such readings
    /// leave the history untouched.
    pub fn smooth(&mut self, raw_altitude: Option<f64>) -> Option<f64> {
        let altitude = raw_altitude.filter(|a| a.is_finite())?;
        self.history.push(altitude);
        self.history.mean()
    }

    /// Start a fresh history, optionally seeded with one reading.
    pub fn reset(&mut self, seed: Option<f64>) {
        self.history.clear();
        if let Some(altitude) = seed.filter(|a| a.is_finite()) {
            self.history.push(altitude);
        }
    }

    pub fn current(&self) -> Option<f64> {
        self.history.mean()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl Default for ElevationSmoother {
    fn default() -> Self {
        Self::new(ELEVATION_HISTORY_CAPACITY)
    }
}
