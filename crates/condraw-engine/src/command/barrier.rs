use crate::backend::BufferRegion;

/// Execution stage that produces or consumes memory.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Stage {
    Host,
    Compute,
    Vertex,
    Fragment,
}

/// Makes writes performed by `src` on `region` visible to accesses from `dst`.
///
/// Barriers are the only ordering between the compute dispatch and the render
/// pass of a frame. Backends must not rely on submission order for it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Barrier {
    pub src: Stage,
    pub dst: Stage,
    pub region: BufferRegion,
}

impl Barrier {
    #[inline]
    pub const fn new(src: Stage, dst: Stage, region: BufferRegion) -> Self {
        Self { src, dst, region }
    }

    /// Host writes to `region` become visible to the compute stage.
    #[inline]
    pub const fn host_to_compute(region: BufferRegion) -> Self {
        Self::new(Stage::Host, Stage::Compute, region)
    }

    /// Compute writes to `region` become visible to fragment-stage reads.
    #[inline]
    pub const fn compute_to_fragment(region: BufferRegion) -> Self {
        Self::new(Stage::Compute, Stage::Fragment, region)
    }

    /// Returns `true` if this barrier orders `src -> dst` over all of `region`.
    #[inline]
    pub fn orders(&self, src: Stage, dst: Stage, region: &BufferRegion) -> bool {
        self.src == src && self.dst == dst && self.region.contains(region)
    }
}
