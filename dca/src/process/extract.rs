use crate::process::MAX_FRAME_BYTES;
use crate::structs::frame::{EncodedFrame, LENGTH_PREFIX_BYTES};
use crate::utils::errors::ExtractError;
use std::collections::VecDeque;

/// Splits a DCA byte stream back into encoded frames.
///
/// Bytes are pushed in arbitrary pieces; iteration yields every complete
/// record. A record that is not yet fully buffered yields
/// [`ExtractError::InsufficientData`] and stays in the buffer until more
/// bytes arrive.
///
/// # Example
///
/// ```rust,no_run
/// use dca::process::extract::Extractor;
///
/// let mut extractor = Extractor::default();
/// extractor.push_bytes(&std::fs::read("song.dca")?);
///
/// for frame in extractor.by_ref().map_while(Result::ok) {
///     println!("{} byte frame", frame.len());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Extractor {
    buffer: VecDeque<u8>,
    max_frame_bytes: usize,
    frames_extracted: usize,
    bytes_consumed: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(MAX_FRAME_BYTES)
    }
}

impl Extractor {
    /// Creates an extractor rejecting frames longer than `max_frame_bytes`.
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(64 * 1024),
            max_frame_bytes,
            frames_extracted: 0,
            bytes_consumed: 0,
        }
    }

    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Bytes buffered but not yet returned as part of a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn frames_extracted(&self) -> usize {
        self.frames_extracted
    }

    /// Stream offset of the next record.
    pub fn bytes_consumed(&self) -> usize {
        self.bytes_consumed
    }

    fn peek_length(&self) -> Option<i16> {
        if self.buffer.len() < LENGTH_PREFIX_BYTES {
            return None;
        }
        Some(i16::from_le_bytes([self.buffer[0], self.buffer[1]]))
    }
}

impl Iterator for Extractor {
    type Item = Result<EncodedFrame, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() {
            return None;
        }

        let Some(len) = self.peek_length() else {
            return Some(Err(ExtractError::InsufficientData));
        };

        if len < 0 || len as usize > self.max_frame_bytes {
            // No way to resynchronize past a corrupt prefix; drop it
            self.buffer.drain(..LENGTH_PREFIX_BYTES);
            self.bytes_consumed += LENGTH_PREFIX_BYTES;
            return Some(Err(ExtractError::InvalidLength(len)));
        }

        let len = len as usize;
        if self.buffer.len() < LENGTH_PREFIX_BYTES + len {
            return Some(Err(ExtractError::InsufficientData));
        }

        self.buffer.drain(..LENGTH_PREFIX_BYTES);
        let data: Vec<u8> = self.buffer.drain(..len).collect();
        self.frames_extracted += 1;
        self.bytes_consumed += LENGTH_PREFIX_BYTES + len;

        Some(Ok(EncodedFrame::new(data)))
    }
}

#[test]
fn extracts_written_frames() -> anyhow::Result<()> {
    use crate::structs::frame::write_frame;

    let payloads: [&[u8]; 3] = [&[1, 2, 3], &[], &[0xFF; 300]];
    let mut stream = Vec::new();
    for payload in payloads {
        write_frame(&mut stream, payload)?;
    }

    let mut extractor = Extractor::default();
    // Split mid-prefix and mid-payload
    extractor.push_bytes(&stream[..1]);
    assert!(matches!(
        extractor.next(),
        Some(Err(ExtractError::InsufficientData))
    ));
    extractor.push_bytes(&stream[1..4]);
    assert!(matches!(
        extractor.next(),
        Some(Err(ExtractError::InsufficientData))
    ));
    extractor.push_bytes(&stream[4..]);

    let frames: Vec<EncodedFrame> = extractor.by_ref().collect::<Result<_, _>>()?;
    assert_eq!(frames.len(), 3);
    for (frame, payload) in frames.iter().zip(payloads) {
        assert_eq!(frame.as_ref(), payload);
    }
    let wire: usize = frames.iter().map(EncodedFrame::wire_len).sum();
    assert_eq!(extractor.bytes_consumed(), wire);
    assert_eq!(wire, stream.len());
    assert_eq!(extractor.buffered(), 0);
    assert!(extractor.next().is_none());
    Ok(())
}

#[test]
fn rejects_corrupt_prefixes() {
    let mut extractor = Extractor::new(100);
    extractor.push_bytes(&(-5i16).to_le_bytes());
    extractor.push_bytes(&500i16.to_le_bytes());
    extractor.push_bytes(&[1, 0, 42]);

    assert!(matches!(
        extractor.next(),
        Some(Err(ExtractError::InvalidLength(-5)))
    ));
    assert!(matches!(
        extractor.next(),
        Some(Err(ExtractError::InvalidLength(500)))
    ));
    let frame = extractor.next().unwrap().unwrap();
    assert_eq!(frame.as_ref(), &[42]);
    assert_eq!(extractor.frames_extracted(), 1);
}
