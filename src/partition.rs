//! Line-aligned chunk planning over a byte-addressable input.

use std::io;

use tracing::debug;

use crate::readers::ChunkSource;

/// How many chunks each worker should get on average, so a slow chunk does
/// not leave the other workers idle at the end of the run.
pub const CHUNKS_PER_WORKER: u64 = 4;

/// Size of the window read while looking for the end of a line.
const PROBE_SIZE: usize = 4096;

/// A contiguous `[start, end)` byte range holding whole lines only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub id: u64,
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Bounds on the byte size of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSizing {
    pub min_bytes: u64,
    pub max_bytes: u64,
}

impl ChunkSizing {
    /// Target chunk size for an input of `total` bytes split over `workers`.
    pub fn chunk_size(&self, total: u64, workers: usize) -> u64 {
        let slots = (workers.max(1) as u64) * CHUNKS_PER_WORKER;
        total
            .div_ceil(slots)
            .clamp(self.min_bytes.max(1), self.max_bytes.max(self.min_bytes).max(1))
    }
}

/// Splits a [`ChunkSource`] into line-aligned chunks.
pub struct Partitioner<'a, S: ChunkSource + ?Sized> {
    source: &'a S,
    sizing: ChunkSizing,
}

impl<'a, S: ChunkSource + ?Sized> Partitioner<'a, S> {
    pub fn new(source: &'a S, sizing: ChunkSizing) -> Self {
        Self { source, sizing }
    }

    /// Plan chunks for `workers` workers. The chunks cover the input exactly
    /// and every boundary sits right after a `\n` (or at end of input).
    pub fn plan(&self, workers: usize) -> io::Result<Vec<ChunkRange>> {
        let total = self.source.len();
        let chunk_size = self.sizing.chunk_size(total, workers);
        let mut chunks = Vec::with_capacity(total.div_ceil(chunk_size.max(1)) as usize);

        let mut start = 0u64;
        while start < total {
            let tentative = start.saturating_add(chunk_size);
            let end = if tentative >= total {
                total
            } else {
                self.next_line_start(tentative)?
            };
            chunks.push(ChunkRange {
                id: chunks.len() as u64,
                start,
                end,
            });
            start = end;
        }

        debug!(
            total_bytes = total,
            chunk_size,
            chunks = chunks.len(),
            "planned chunks"
        );
        Ok(chunks)
    }

    /// Offset just past the first `\n` at or after `from - 1`, so a boundary
    /// that already follows a newline stays where it is.
    fn next_line_start(&self, from: u64) -> io::Result<u64> {
        let total = self.source.len();
        let mut offset = from - 1;
        let mut probe = vec![0u8; PROBE_SIZE];
        while offset < total {
            let n = self.source.read_at(offset, &mut probe)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("input ended at byte {} while planning chunks", offset),
                ));
            }
            if let Some(pos) = probe[..n].iter().position(|&b| b == b'\n') {
                return Ok(offset + pos as u64 + 1);
            }
            offset += n as u64;
        }
        Ok(total)
    }
}
