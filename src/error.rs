//! Error types for the aggregation engine

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by an aggregation run. Display messages do not repeat
/// their source; print the chain (`{:#}` through anyhow) for the full story.
///
/// Malformed lines never become an `Error`: the aggregator counts them in
/// [`crate::stats::MalformedCounts`] and keeps going. Every variant here
/// aborts the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open input '{}'", path.display())]
    InputOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read chunk {chunk} (bytes {start}..{end})")]
    ChunkRead {
        chunk: u64,
        start: u64,
        end: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to write output '{path}'")]
    OutputWrite {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{thread} thread panicked")]
    ThreadPanic { thread: String },

    #[error("failed to spawn thread")]
    Spawn(#[source] io::Error),

    #[error("only {received} of {expected} chunk results were merged")]
    IncompleteRun { expected: u64, received: u64 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Chunk-level read failure for a streamed input, where offsets are only
    /// known as a count of bytes consumed so far.
    pub(crate) fn stream_read(chunk: u64, offset: u64, source: io::Error) -> Self {
        Error::ChunkRead {
            chunk,
            start: offset,
            end: offset,
            source,
        }
    }
}

/// Result type for aggregation operations
pub type Result<T> = std::result::Result<T, Error>;
