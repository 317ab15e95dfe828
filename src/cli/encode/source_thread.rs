use std::sync::mpsc;
use std::thread;

use anyhow::Result;
use dca::structs::chunk::OwnedChunk;

use crate::source::AudioSource;

/// Chunks decoded ahead of the encoder.
pub const CHUNK_QUEUE_DEPTH: usize = 32;

pub struct SourceThreadConfig {
    pub source: AudioSource,
    pub tx: mpsc::SyncSender<Result<OwnedChunk>>,
}

/// Decodes on a separate thread, forwarding chunks until end of stream.
///
/// A read error is sent down the channel and ends the thread, so the
/// receiver is the only place errors surface. The channel closing early
/// means the receiver gave up, which also ends the thread.
pub fn spawn_source_thread(config: SourceThreadConfig) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let SourceThreadConfig { mut source, tx } = config;
        let channels = source.spec().channels as u64;

        let mut chunk_count = 0u64;
        let mut total_samples = 0u64;

        loop {
            match source.read_chunk() {
                Ok(Some(chunk)) => {
                    chunk_count += 1;
                    total_samples += chunk.len() as u64;
                    if tx.send(Ok(chunk)).is_err() {
                        log::debug!("Encoder stopped receiving; ending decode early");
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            }
        }

        if source.skipped_packets() > 0 {
            log::warn!(
                "{} undecodable packet(s) were skipped",
                source.skipped_packets()
            );
        }
        log::info!(
            "Decoding complete: {chunk_count} chunks, {} sample-frames",
            total_samples / channels
        );
    })
}
