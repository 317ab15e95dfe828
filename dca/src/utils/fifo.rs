use crate::utils::errors::{AllocationError, ConversionError, EncodeError};
use anyhow::Result;
use std::collections::VecDeque;

/// First-in first-out store of interleaved 16-bit sample-frames.
///
/// The buffer holds a whole number of sample-frames at all times: every
/// write appends complete frames and every read removes complete frames.
#[derive(Debug)]
pub struct SampleFifo {
    samples: VecDeque<i16>,
    channels: usize,
}

impl SampleFifo {
    pub fn new(channels: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            channels,
        }
    }

    /// Appends interleaved samples to the tail.
    pub fn write(&mut self, samples: &[i16]) -> Result<()> {
        if samples.len() % self.channels != 0 {
            return Err(ConversionError::PartialFrame {
                samples: samples.len(),
                channels: self.channels,
            }
            .into());
        }

        self.samples
            .try_reserve(samples.len())
            .map_err(|_| AllocationError::Fifo(samples.len()))?;
        self.samples.extend(samples);
        Ok(())
    }

    /// Appends `frame_count` frames of silence.
    pub fn write_silence(&mut self, frame_count: usize) -> Result<()> {
        let count = frame_count
            .checked_mul(self.channels)
            .ok_or(AllocationError::Fifo(frame_count))?;
        self.samples
            .try_reserve(count)
            .map_err(|_| AllocationError::Fifo(count))?;
        self.samples.extend(std::iter::repeat_n(0, count));
        Ok(())
    }

    /// Buffered sample-frames.
    pub fn size(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Removes `frame_count` frames from the head into `dst`.
    ///
    /// Fails without touching the buffer when fewer frames are buffered.
    /// `dst` must hold exactly `frame_count` frames.
    pub fn read(&mut self, frame_count: usize, dst: &mut [i16]) -> Result<usize> {
        let available = self.size();
        if frame_count > available {
            return Err(EncodeError::ShortFrame {
                available,
                frame_size: frame_count,
            }
            .into());
        }

        let count = frame_count * self.channels;
        debug_assert_eq!(dst.len(), count);
        for (d, s) in dst.iter_mut().zip(self.samples.drain(..count)) {
            *d = s;
        }
        Ok(frame_count)
    }
}
