use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use symphonia::core::io::{MediaSource, ReadOnlySource};

/// Returns true when `path` names stdin.
pub fn is_pipe<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().as_os_str() == "-"
}

/// Opens `path` (or stdin for "-") as a byte source for the demuxer.
///
/// Stdin is not seekable, so formats that need to seek (MP4 with a trailing
/// `moov`) only work from files.
pub fn open_media_source<P: AsRef<Path>>(path: P) -> Result<Box<dyn MediaSource>> {
    let path = path.as_ref();
    if is_pipe(path) {
        return Ok(Box::new(ReadOnlySource::new(io::stdin())));
    }

    let file =
        File::open(path).with_context(|| format!("Couldn't open input {}", path.display()))?;
    Ok(Box::new(file))
}

/// Buffered byte reader over a file or stdin pipe.
pub struct InputReader {
    reader: Box<dyn Read>,
    bytes_read: u64,
}

impl InputReader {
    /// Use "-" for stdin pipe input.
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let path = input_path.as_ref();
        let reader: Box<dyn Read> = if is_pipe(path) {
            Box::new(io::stdin().lock())
        } else {
            let file = File::open(path)
                .with_context(|| format!("Couldn't open input {}", path.display()))?;
            Box::new(BufReader::new(file))
        };

        Ok(Self {
            reader,
            bytes_read: 0,
        })
    }

    #[cfg(test)]
    fn from_reader<R: Read + 'static>(reader: R) -> Self {
        Self {
            reader: Box::new(reader),
            bytes_read: 0,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Feeds the input to `callback` in pieces of at most `chunk_size` bytes
    /// until EOF or until the callback returns `Ok(false)`.
    pub fn process_chunks<F>(&mut self, chunk_size: usize, mut callback: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<bool>,
    {
        let mut buffer = vec![0u8; chunk_size];

        loop {
            let n = match self.reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.bytes_read += n as u64;

            if !callback(&buffer[..n])? {
                break;
            }
        }

        Ok(())
    }
}
