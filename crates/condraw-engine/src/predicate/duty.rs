/// Square wave over a tick counter: active for the first `active` ticks of every
/// `period`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DutyCycle {
    period: u64,
    active: u64,
}

impl DutyCycle {
    /// 120-tick period, active for the first 60.
    pub const DEFAULT: DutyCycle = DutyCycle {
        period: 120,
        active: 60,
    };

    /// Returns `None` for a zero period or an active window longer than the period.
    pub const fn new(period: u64, active: u64) -> Option<Self> {
        if period == 0 || active > period {
            return None;
        }
        Some(Self { period, active })
    }

    #[inline]
    pub const fn period(&self) -> u64 {
        self.period
    }

    #[inline]
    pub const fn active(&self) -> u64 {
        self.active
    }

    #[inline]
    pub const fn is_active(&self, tick: u64) -> bool {
        tick % self.period < self.active
    }

    /// Condition value as the device reads it: 1 when active, 0 otherwise.
    #[inline]
    pub const fn condition(&self, tick: u64) -> u32 {
        self.is_active(tick) as u32
    }
}

impl Default for DutyCycle {
    fn default() -> Self {
        Self::DEFAULT
    }
}
