//! Per-key min/mean/max aggregation over large `key;value` inputs.
//!
//! The input is split into line-aligned chunks that are folded on worker
//! threads into per-key partial statistics; the partial maps are merged and
//! rendered as sorted `key=min/mean/max` lines.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod config_file;
pub mod decompression;
pub mod error;
pub mod formatters;
pub mod parallel;
pub mod parsers;
pub mod partition;
pub mod platform;
pub mod readers;
pub mod runner;
pub mod stats;

pub use aggregate::{AggregateMap, Aggregation, ChunkAggregator, MapMerger, PartialStat};
pub use config::{KeyOrder, KeystatConfig, MergeStrategy, RoundingMode};
pub use error::{Error, Result};
pub use formatters::{format_map, FormatOptions};
pub use parsers::{parse_line, MalformedLine, Record};
pub use partition::{ChunkRange, ChunkSizing, Partitioner};
pub use readers::{ChunkSource, FileSource, Input, MemorySource};
pub use stats::ProcessingStats;
