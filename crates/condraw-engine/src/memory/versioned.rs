use bytemuck::Pod;

use crate::backend::{align_up, Backend, BufferDesc, BufferId, BufferRegion, BufferUsage};

use super::RegionError;

/// One logical value of `T`, versioned per in-flight frame.
///
/// The device buffer holds `frame_count` regions of `stride` bytes each, where
/// `stride` is `size_of::<T>()` rounded up to the device's offset alignment. The
/// host keeps a single staged copy; [`flush`](Self::flush) copies it into the
/// region of the frame about to be submitted.
///
/// Only one region is written per flush, and only the region belonging to the
/// submitted frame is ever read by the device.
#[derive(Debug)]
pub struct VersionedBuffer<T: Pod> {
    buffer: BufferId,
    frame_count: usize,
    stride: u64,
    staged: T,

    /// Bumped on every host mutation of `staged`.
    generation: u64,
    /// Generation last copied into each region, if any.
    flushed: Vec<Option<u64>>,
}

impl<T: Pod> VersionedBuffer<T> {
    /// Allocates `frame_count` aligned regions and stages `initial`.
    pub fn new<B: Backend>(
        backend: &mut B,
        label: &str,
        frame_count: usize,
        usage: BufferUsage,
        initial: T,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(frame_count > 0, "`{label}` needs at least one frame region");

        let alignment = backend.capabilities().min_offset_alignment.max(1);
        let stride = align_up(std::mem::size_of::<T>() as u64, alignment);

        let buffer = backend.create_buffer(&BufferDesc {
            label,
            size: stride * frame_count as u64,
            usage,
        })?;

        log::debug!(
            "versioned buffer `{label}`: {frame_count} x {stride} bytes ({} bytes payload)",
            std::mem::size_of::<T>()
        );

        Ok(Self {
            buffer,
            frame_count,
            stride,
            staged: initial,
            generation: 1,
            flushed: vec![None; frame_count],
        })
    }

    /// The staged value for the current write target.
    #[inline]
    pub fn data(&self) -> &T {
        &self.staged
    }

    /// Mutable access to the staged value. Marks it changed.
    #[inline]
    pub fn data_mut(&mut self) -> &mut T {
        self.generation = self.generation.wrapping_add(1);
        &mut self.staged
    }

    /// Replaces the staged value.
    #[inline]
    pub fn write(&mut self, value: T) {
        *self.data_mut() = value;
    }

    #[inline]
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Distance in bytes between consecutive frame regions.
    #[inline]
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Bytes of `T` inside each region (the rest is alignment padding).
    #[inline]
    pub fn element_size(&self) -> u64 {
        std::mem::size_of::<T>() as u64
    }

    /// Byte offset of `index`'s region.
    pub fn offset_for(&self, index: usize) -> Result<u64, RegionError> {
        self.check(index)?;
        Ok(index as u64 * self.stride)
    }

    /// The element-sized region for frame `index`.
    pub fn region(&self, index: usize) -> Result<BufferRegion, RegionError> {
        Ok(BufferRegion::new(
            self.buffer,
            self.offset_for(index)?,
            self.element_size(),
        ))
    }

    /// Copies the staged value into frame `index`'s region.
    ///
    /// Returns `true` if bytes were written. Without `force`, a region already
    /// holding the current generation is skipped. Pass `force` for regions the
    /// device writes to: the host's record of what it last wrote is stale then.
    pub fn flush<B: Backend>(
        &mut self,
        backend: &mut B,
        index: usize,
        force: bool,
    ) -> anyhow::Result<bool> {
        let region = self.region(index)?;
        if !force && self.flushed[index] == Some(self.generation) {
            return Ok(false);
        }

        backend.write_buffer(region, bytemuck::bytes_of(&self.staged))?;
        self.flushed[index] = Some(self.generation);
        Ok(true)
    }

    fn check(&self, index: usize) -> Result<(), RegionError> {
        if index >= self.frame_count {
            return Err(RegionError::IndexOutOfRange {
                index,
                frame_count: self.frame_count,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SoftBackend, SoftConfig};

    fn backend() -> SoftBackend {
        SoftBackend::new(SoftConfig::default())
    }

    #[test]
    fn stride_is_rounded_to_alignment() {
        let mut b = backend();
        let buf = VersionedBuffer::new(&mut b, "u32", 3, BufferUsage::Uniform, 0u32).unwrap();
        assert_eq!(buf.stride(), 256);
        assert_eq!(buf.element_size(), 4);
    }

    #[test]
    fn offsets_are_increasing_aligned_and_disjoint() {
        let mut b = backend();
        let buf =
            VersionedBuffer::new(&mut b, "mat", 4, BufferUsage::Uniform, [0.0f32; 16]).unwrap();

        let regions: Vec<_> = (0..4).map(|i| buf.region(i).unwrap()).collect();
        for (i, r) in regions.iter().enumerate() {
            assert_eq!(r.offset % 256, 0);
            for other in &regions[i + 1..] {
                assert!(r.offset < other.offset);
                assert!(!r.overlaps(other));
            }
        }
    }

    #[test]
    fn out_of_range_index_fails() {
        let mut b = backend();
        let mut buf = VersionedBuffer::new(&mut b, "u32", 2, BufferUsage::Uniform, 0u32).unwrap();
        assert_eq!(
            buf.offset_for(2),
            Err(RegionError::IndexOutOfRange {
                index: 2,
                frame_count: 2
            })
        );
        assert!(buf.flush(&mut b, 5, false).is_err());
    }

    #[test]
    fn zero_frames_is_rejected() {
        let mut b = backend();
        assert!(VersionedBuffer::new(&mut b, "none", 0, BufferUsage::Uniform, 0u32).is_err());
    }

    #[test]
    fn flush_writes_only_the_target_region() {
        let mut b = backend();
        let mut buf = VersionedBuffer::new(&mut b, "u32", 3, BufferUsage::Uniform, 0u32).unwrap();
        buf.write(7);
        assert!(buf.flush(&mut b, 1, false).unwrap());

        let read = |b: &SoftBackend, i| b.read_value::<u32>(buf.region(i).unwrap()).unwrap();
        assert_eq!(read(&b, 0), 0);
        assert_eq!(read(&b, 1), 7);
        assert_eq!(read(&b, 2), 0);
    }

    #[test]
    fn unchanged_value_is_not_rewritten_unless_forced() {
        let mut b = backend();
        let mut buf = VersionedBuffer::new(&mut b, "u32", 2, BufferUsage::Uniform, 3u32).unwrap();
        assert!(buf.flush(&mut b, 0, false).unwrap());
        assert!(!buf.flush(&mut b, 0, false).unwrap());
        assert!(buf.flush(&mut b, 0, true).unwrap());

        buf.data_mut();
        assert!(buf.flush(&mut b, 0, false).unwrap());
    }
}
