use crate::utils::errors::EncodeError;
use anyhow::Result;
use std::io::Write;

/// Size of the length prefix written before every frame.
pub const LENGTH_PREFIX_BYTES: usize = 2;

/// One encoded frame as stored in a DCA stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    data: Vec<u8>,
}

impl EncodedFrame {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the frame on the wire, prefix included.
    pub fn wire_len(&self) -> usize {
        LENGTH_PREFIX_BYTES + self.data.len()
    }
}

impl AsRef<[u8]> for EncodedFrame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Writes `payload` as one DCA record: a little-endian `i16` byte length
/// followed by the payload itself.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = i16::try_from(payload.len()).map_err(|_| EncodeError::FrameTooLarge(payload.len()))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn record_layout() -> Result<()> {
        let mut cursor = Cursor::new(Vec::new());
        write_frame(&mut cursor, &[0xAA, 0xBB, 0xCC])?;
        write_frame(&mut cursor, &[])?;

        assert_eq!(cursor.into_inner(), vec![3, 0, 0xAA, 0xBB, 0xCC, 0, 0]);
        Ok(())
    }

    #[test]
    fn oversize_payload_is_rejected() {
        let payload = vec![0u8; i16::MAX as usize + 1];
        let mut sink = Vec::new();

        let err = write_frame(&mut sink, &payload).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EncodeError>(),
            Some(EncodeError::FrameTooLarge(_))
        ));
        assert!(sink.is_empty());
    }
}
