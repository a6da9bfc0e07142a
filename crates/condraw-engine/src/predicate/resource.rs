use bytemuck::{Pod, Zeroable};

use crate::backend::{Backend, BufferRegion, BufferUsage};
use crate::memory::{RegionError, VersionedBuffer};

/// Device-visible condition. Nonzero means execute, zero means skip.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct ConditionData {
    pub condition: u32,
}

/// Reference to a condition value plus the sense in which it is read.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PredicateRef {
    pub region: BufferRegion,
    pub invert: bool,
}

impl PredicateRef {
    #[inline]
    pub const fn direct(region: BufferRegion) -> Self {
        Self {
            region,
            invert: false,
        }
    }

    #[inline]
    pub const fn inverted(region: BufferRegion) -> Self {
        Self {
            region,
            invert: true,
        }
    }

    /// The complementary reference over the same region.
    #[inline]
    pub const fn complement(self) -> Self {
        Self {
            region: self.region,
            invert: !self.invert,
        }
    }

    /// Whether a range gated by this reference executes for the raw value `raw`.
    #[inline]
    pub const fn passes(&self, raw: u32) -> bool {
        (raw != 0) != self.invert
    }
}

/// Frame-indexed condition value.
///
/// Handing out a [`direct`](Self::direct) and an [`inverted`](Self::inverted)
/// reference for the same frame yields two ranges of which exactly one runs.
#[derive(Debug)]
pub struct PredicateResource {
    values: VersionedBuffer<ConditionData>,
}

impl PredicateResource {
    pub fn new<B: Backend>(
        backend: &mut B,
        label: &str,
        frame_count: usize,
        initial: bool,
    ) -> anyhow::Result<Self> {
        let values = VersionedBuffer::new(
            backend,
            label,
            frame_count,
            BufferUsage::Predicate,
            ConditionData {
                condition: initial as u32,
            },
        )?;
        Ok(Self { values })
    }

    /// Stages the condition for the next flush.
    pub fn set(&mut self, active: bool) {
        let condition = active as u32;
        if self.values.data().condition != condition {
            self.values.data_mut().condition = condition;
        }
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.values.data().condition != 0
    }

    pub fn direct(&self, index: usize) -> Result<PredicateRef, RegionError> {
        Ok(PredicateRef::direct(self.values.region(index)?))
    }

    pub fn inverted(&self, index: usize) -> Result<PredicateRef, RegionError> {
        Ok(PredicateRef::inverted(self.values.region(index)?))
    }

    pub fn flush<B: Backend>(&mut self, backend: &mut B, index: usize) -> anyhow::Result<bool> {
        self.values.flush(backend, index, false)
    }

    #[inline]
    pub fn buffer(&self) -> &VersionedBuffer<ConditionData> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SoftBackend, SoftConfig};
    use crate::predicate::DutyCycle;

    #[test]
    fn direct_and_inverted_are_complements() {
        let region = BufferRegion::new(crate::backend::BufferId(0), 0, 4);
        let direct = PredicateRef::direct(region);
        let inverted = PredicateRef::inverted(region);
        assert_eq!(direct.complement(), inverted);

        for raw in [0u32, 1, 2, u32::MAX] {
            assert_ne!(direct.passes(raw), inverted.passes(raw), "raw {raw}");
        }
    }

    #[test]
    fn exactly_one_branch_passes_for_every_tick() {
        let duty = DutyCycle::default();
        let region = BufferRegion::new(crate::backend::BufferId(0), 0, 4);
        for tick in 0..480 {
            let raw = duty.condition(tick);
            let direct = PredicateRef::direct(region).passes(raw);
            let inverted = PredicateRef::inverted(region).passes(raw);
            assert_eq!(inverted, !direct, "tick {tick}");
            assert_eq!(direct, tick % 120 < 60);
        }
    }

    #[test]
    fn references_share_the_frame_region() {
        let mut b = SoftBackend::new(SoftConfig::default());
        let p = PredicateResource::new(&mut b, "cond", 3, true).unwrap();
        for i in 0..3 {
            assert_eq!(p.direct(i).unwrap().region, p.inverted(i).unwrap().region);
        }
        assert!(p.direct(3).is_err());
    }

    #[test]
    fn set_is_visible_after_flush() {
        let mut b = SoftBackend::new(SoftConfig::default());
        let mut p = PredicateResource::new(&mut b, "cond", 2, true).unwrap();
        p.set(false);
        p.flush(&mut b, 1).unwrap();

        let raw = b.read_value::<u32>(p.direct(1).unwrap().region).unwrap();
        assert_eq!(raw, 0);
        assert!(!p.is_set());
    }

    #[test]
    fn unchanged_condition_does_not_reflush() {
        let mut b = SoftBackend::new(SoftConfig::default());
        let mut p = PredicateResource::new(&mut b, "cond", 1, true).unwrap();
        assert!(p.flush(&mut b, 0).unwrap());
        p.set(true);
        assert!(!p.flush(&mut b, 0).unwrap());
        p.set(false);
        assert!(p.flush(&mut b, 0).unwrap());
    }
}
