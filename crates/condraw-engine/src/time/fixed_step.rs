/// Constant time step for headless runs, where wall-clock time would make the
/// accumulated rotation irreproducible.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FixedStep {
    dt: f32,
    elapsed: u64,
}

impl FixedStep {
    /// Returns `None` unless `dt` is finite and non-negative.
    pub fn new(dt: f32) -> Option<Self> {
        (dt.is_finite() && dt >= 0.0).then_some(Self { dt, elapsed: 0 })
    }

    /// One step at `hz` steps per second.
    pub fn from_hz(hz: f32) -> Option<Self> {
        if hz > 0.0 { Self::new(hz.recip()) } else { None }
    }

    #[inline]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Number of steps taken so far.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.elapsed
    }

    pub fn tick(&mut self) -> f32 {
        self.elapsed = self.elapsed.wrapping_add(1);
        self.dt
    }
}

impl Default for FixedStep {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            elapsed: 0,
        }
    }
}
