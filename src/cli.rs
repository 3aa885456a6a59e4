// CLI-specific types and structures
// This module contains the command-line interface definitions and parsing logic

use clap::Parser;

use crate::config::{
    parse_byte_size, KeyOrder, MergeStrategy, RoundingMode, StatsFormat,
    DEFAULT_MAX_CHUNK_BYTES, DEFAULT_MIN_CHUNK_BYTES, DEFAULT_SMALL_INPUT_BYTES,
};

// CLI structure - contains all command-line arguments and options
#[derive(Parser, Debug)]
#[command(name = "keystat")]
#[command(about = "Per-key min/mean/max over large key;value files")]
#[command(
    long_about = "Per-key min/mean/max over large key;value files\n\nReads lines of the form 'key;value', splits the input into line-aligned chunks,\naggregates them on worker threads and writes one 'key=min/mean/max' line per key,\nsorted by key.\n\nCOMMON EXAMPLES:\n  keystat measurements.txt -o results.txt\n  keystat measurements.txt.gz --threads 8 --stats\n  cat measurements.txt | keystat"
)]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Input file ("-" for stdin). Gzip and zstd inputs are decompressed automatically.
    #[arg(default_value = "-", help_heading = "Input Options")]
    pub input: String,

    /// Output file ("-" for stdout). Written atomically: a failed run leaves no file behind.
    #[arg(
        short = 'o',
        long = "output",
        default_value = "-",
        help_heading = "Output Options"
    )]
    pub output: String,

    /// Rounding applied to min, mean and max
    #[arg(
        long = "rounding",
        value_enum,
        default_value = "ceil",
        help_heading = "Output Options"
    )]
    pub rounding: RoundingMode,

    /// Output key ordering
    #[arg(
        long = "key-order",
        value_enum,
        default_value = "ordinal",
        help_heading = "Output Options"
    )]
    pub key_order: KeyOrder,

    /// Number of worker threads (0 = available parallelism minus one)
    #[arg(
        short = 'j',
        long = "threads",
        env = "KEYSTAT_THREADS",
        default_value_t = 0,
        help_heading = "Performance Options"
    )]
    pub threads: usize,

    /// Smallest chunk handed to a worker (accepts K/M/G suffixes)
    #[arg(
        long = "min-chunk-size",
        env = "KEYSTAT_MIN_CHUNK_SIZE",
        value_parser = parse_byte_size,
        default_value_t = DEFAULT_MIN_CHUNK_BYTES,
        help_heading = "Performance Options"
    )]
    pub min_chunk_size: u64,

    /// Largest chunk handed to a worker (accepts K/M/G suffixes)
    #[arg(
        long = "max-chunk-size",
        env = "KEYSTAT_MAX_CHUNK_SIZE",
        value_parser = parse_byte_size,
        default_value_t = DEFAULT_MAX_CHUNK_BYTES,
        help_heading = "Performance Options"
    )]
    pub max_chunk_size: u64,

    /// Inputs smaller than this are processed on a single thread
    #[arg(
        long = "small-input-threshold",
        env = "KEYSTAT_SMALL_INPUT_THRESHOLD",
        value_parser = parse_byte_size,
        default_value_t = DEFAULT_SMALL_INPUT_BYTES,
        help_heading = "Performance Options"
    )]
    pub small_input_threshold: u64,

    /// How partial results from workers are merged
    #[arg(
        long = "merge",
        value_enum,
        default_value = "incremental",
        help_heading = "Performance Options"
    )]
    pub merge: MergeStrategy,

    /// Print processing stats to stderr. Use -s for default (table), or --stats=FORMAT for explicit format.
    #[arg(
        short = 's',
        long = "stats",
        value_enum,
        value_name = "FORMAT",
        require_equals = true,
        num_args = 0..=1,
        default_missing_value = "table",
        help_heading = "Diagnostics"
    )]
    pub stats: Option<StatsFormat>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Diagnostics")]
    pub verbose: u8,

    /// Only log errors
    #[arg(
        short = 'q',
        long = "quiet",
        conflicts_with = "verbose",
        help_heading = "Diagnostics"
    )]
    pub quiet: bool,

    /// Use this config file instead of the default locations
    #[arg(long = "config-file", help_heading = "Configuration")]
    pub config_file: Option<String>,

    /// Ignore config files
    #[arg(long = "ignore-config", help_heading = "Configuration")]
    pub ignore_config: bool,
}

impl Cli {
    /// Log filter directive implied by -v/-q, used when RUST_LOG is unset
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
