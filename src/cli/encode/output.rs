use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use dca::structs::frame::{LENGTH_PREFIX_BYTES, write_frame};

use crate::input::is_pipe;

/// Writes length-prefixed frames and keeps running totals.
pub struct FrameWriter<W: Write> {
    writer: W,
    frames_written: u64,
    bytes_written: u64,
}

impl FrameWriter<Box<dyn Write>> {
    /// Opens `path` for writing, or stdout when `path` is `None` or "-".
    pub fn create(path: Option<&Path>) -> Result<Self> {
        let writer: Box<dyn Write> = match path {
            Some(path) if !is_pipe(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Couldn't create output {}", path.display()))?;
                log::info!("Writing DCA stream to {}", path.display());
                Box::new(BufWriter::new(file))
            }
            _ => {
                log::debug!("Writing DCA stream to stdout");
                Box::new(BufWriter::new(io::stdout().lock()))
            }
        };
        Ok(Self::new(writer))
    }
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_written: 0,
            bytes_written: 0,
        }
    }

    pub fn write(&mut self, payload: &[u8]) -> Result<()> {
        write_frame(&mut self.writer, payload).context("Couldn't write frame")?;
        self.frames_written += 1;
        self.bytes_written += (LENGTH_PREFIX_BYTES + payload.len()) as u64;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Bytes written including length prefixes.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush().context("Couldn't flush output")?;
        Ok(self.writer)
    }
}

#[test]
fn counts_prefixed_bytes() -> anyhow::Result<()> {
    let mut writer = FrameWriter::new(Vec::new());
    writer.write(&[0xAA; 10])?;
    writer.write(&[])?;

    assert_eq!(writer.frames_written(), 2);
    assert_eq!(writer.bytes_written(), 14);

    let bytes = writer.finish()?;
    assert_eq!(&bytes[..2], &[10, 0]);
    assert_eq!(&bytes[12..], &[0, 0]);
    Ok(())
}
