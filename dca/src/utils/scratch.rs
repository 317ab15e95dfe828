use crate::utils::errors::AllocationError;
use anyhow::Result;

/// A reusable 16-bit sample region for adaptation output and drained frames.
///
/// Capacity only ever grows, so the steady state (stable chunk and frame
/// sizes) performs no allocation. Contents are not preserved across
/// [`reserve`](Self::reserve) and must not be relied on between calls.
#[derive(Debug)]
pub struct ScratchBuffer {
    buf: Vec<i16>,
    channels: usize,
}

impl ScratchBuffer {
    /// Creates an empty scratch region for `channels`-channel sample-frames.
    pub fn new(channels: usize) -> Self {
        Self {
            buf: Vec::new(),
            channels,
        }
    }

    /// Guarantees room for at least `frame_count` sample-frames.
    ///
    /// Replaces the region with one of exactly the requested size when it
    /// is too small; otherwise does nothing.
    pub fn reserve(&mut self, frame_count: usize) -> Result<()> {
        let needed = frame_count
            .checked_mul(self.channels)
            .ok_or(AllocationError::Scratch(frame_count))?;
        if needed <= self.buf.len() {
            return Ok(());
        }

        let mut buf = Vec::new();
        buf.try_reserve_exact(needed)
            .map_err(|_| AllocationError::Scratch(needed))?;
        buf.resize(needed, 0);
        self.buf = buf;

        log::trace!(
            "Scratch grown to {} frames ({} bytes)",
            frame_count,
            self.capacity_bytes()
        );
        Ok(())
    }

    /// Current capacity in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.buf.len() * size_of::<i16>()
    }

    /// Current capacity in sample-frames.
    pub fn capacity_frames(&self) -> usize {
        self.buf.len() / self.channels
    }

    /// The first `frame_count` sample-frames. Panics if not reserved.
    pub fn frames(&self, frame_count: usize) -> &[i16] {
        &self.buf[..frame_count * self.channels]
    }

    /// Mutable view of the first `frame_count` sample-frames. Panics if not reserved.
    pub fn frames_mut(&mut self, frame_count: usize) -> &mut [i16] {
        &mut self.buf[..frame_count * self.channels]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_to_exact_request() -> Result<()> {
        let mut scratch = ScratchBuffer::new(2);
        assert_eq!(scratch.capacity_bytes(), 0);

        scratch.reserve(480)?;
        assert_eq!(scratch.capacity_frames(), 480);
        assert_eq!(scratch.capacity_bytes(), 480 * 2 * 2);
        Ok(())
    }

    #[test]
    fn never_shrinks() -> Result<()> {
        let mut scratch = ScratchBuffer::new(2);
        let mut last = 0;
        for frames in [960, 10, 441, 1920, 960, 0, 1] {
            scratch.reserve(frames)?;
            assert!(scratch.capacity_bytes() >= last);
            assert!(scratch.capacity_frames() >= frames);
            last = scratch.capacity_bytes();
        }
        assert_eq!(scratch.capacity_frames(), 1920);
        Ok(())
    }

    #[test]
    fn views_cover_whole_frames() -> Result<()> {
        let mut scratch = ScratchBuffer::new(3);
        scratch.reserve(4)?;
        scratch.frames_mut(2).copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(scratch.frames(2), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(scratch.frames(4).len(), 12);
        Ok(())
    }

    #[test]
    fn overflowing_request_is_an_allocation_error() -> Result<()> {
        let mut scratch = ScratchBuffer::new(2);
        scratch.reserve(16)?;

        let err = scratch.reserve(usize::MAX).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AllocationError>(),
            Some(AllocationError::Scratch(_))
        ));
        assert_eq!(scratch.capacity_frames(), 16);
        Ok(())
    }
}
