use clap::ValueEnum;

use crate::error::{Error, Result};
use crate::partition::ChunkSizing;

/// Smallest chunk handed to a worker. Tunable, not derived.
pub const DEFAULT_MIN_CHUNK_BYTES: u64 = 1 << 20;
/// Largest chunk handed to a worker; bounds per-chunk memory.
pub const DEFAULT_MAX_CHUNK_BYTES: u64 = 64 << 20;
/// Inputs smaller than this are aggregated on the calling thread.
pub const DEFAULT_SMALL_INPUT_BYTES: u64 = 4 << 20;

/// Main configuration struct for keystat
#[derive(Debug, Clone, Default)]
pub struct KeystatConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub performance: PerformanceConfig,
}

/// Input configuration
#[derive(Debug, Clone)]
pub struct InputConfig {
    /// Input path, `-` for stdin
    pub path: String,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Output path, `-` for stdout
    pub path: String,
    pub rounding: RoundingMode,
    pub key_order: KeyOrder,
}

/// Performance configuration
#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    /// Worker count; 0 picks [`default_threads`].
    pub threads: usize,
    pub min_chunk_bytes: u64,
    pub max_chunk_bytes: u64,
    pub small_input_bytes: u64,
    pub merge: MergeStrategy,
}

/// How values are rounded to one decimal place
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoundingMode {
    /// Toward positive infinity at the tenths place
    #[default]
    Ceil,
    /// Nearest tenth, ties to even
    HalfEven,
}

/// Output key ordering
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyOrder {
    /// Raw byte order
    #[default]
    Ordinal,
    /// ASCII case-insensitive, ties broken by byte order
    CaseInsensitive,
}

/// How the collector combines worker results
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Fold each result into a running accumulator as it arrives
    #[default]
    Incremental,
    /// Keep every partial map and reduce them pairwise at the end
    Tree,
}

/// Stats output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatsFormat {
    Table,
    Json,
}

/// Available parallelism minus one (left for the collector), at least 1.
pub fn default_threads() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "-".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "-".to_string(),
            rounding: RoundingMode::default(),
            key_order: KeyOrder::default(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            min_chunk_bytes: DEFAULT_MIN_CHUNK_BYTES,
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            small_input_bytes: DEFAULT_SMALL_INPUT_BYTES,
            merge: MergeStrategy::default(),
        }
    }
}

impl PerformanceConfig {
    /// Get effective thread count with defaults
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            default_threads()
        } else {
            self.threads
        }
    }

    pub fn chunk_sizing(&self) -> ChunkSizing {
        ChunkSizing {
            min_bytes: self.min_chunk_bytes,
            max_bytes: self.max_chunk_bytes,
        }
    }

    /// Whether an input of `len` bytes is worth dispatching to workers
    pub fn should_use_parallel(&self, len: u64) -> bool {
        self.effective_threads() > 1 && len >= self.small_input_bytes
    }
}

impl KeystatConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let config = Self {
            input: InputConfig {
                path: cli.input.clone(),
            },
            output: OutputConfig {
                path: cli.output.clone(),
                rounding: cli.rounding,
                key_order: cli.key_order,
            },
            performance: PerformanceConfig {
                threads: cli.threads,
                min_chunk_bytes: cli.min_chunk_size,
                max_chunk_bytes: cli.max_chunk_size,
                small_input_bytes: cli.small_input_threshold,
                merge: cli.merge,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let perf = &self.performance;
        if perf.min_chunk_bytes == 0 {
            return Err(Error::Config("minimum chunk size must be positive".into()));
        }
        if perf.min_chunk_bytes > perf.max_chunk_bytes {
            return Err(Error::Config(format!(
                "minimum chunk size ({}) exceeds maximum chunk size ({})",
                perf.min_chunk_bytes, perf.max_chunk_bytes
            )));
        }
        if self.input.path.is_empty() || self.output.path.is_empty() {
            return Err(Error::Config("input and output paths must not be empty".into()));
        }
        Ok(())
    }
}

/// Parse a byte count with an optional binary suffix (`K`, `M`, `G`, with
/// or without a trailing `B`/`iB`).
pub fn parse_byte_size(s: &str) -> std::result::Result<u64, String> {
    let trimmed = s.trim();
    let upper = trimmed.to_ascii_uppercase();
    let digits_end = upper
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(upper.len());
    let (digits, suffix) = upper.split_at(digits_end);
    if digits.is_empty() {
        return Err(format!("invalid byte size '{}'", s));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid byte size '{}'", s))?;
    let shift = match suffix.trim() {
        "" | "B" => 0,
        "K" | "KB" | "KIB" => 10,
        "M" | "MB" | "MIB" => 20,
        "G" | "GB" | "GIB" => 30,
        other => return Err(format!("unknown size suffix '{}' in '{}'", other, s)),
    };
    value
        .checked_mul(1u64 << shift)
        .ok_or_else(|| format!("byte size '{}' is too large", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_byte_size() {
        assert_eq!(parse_byte_size("512"), Ok(512));
        assert_eq!(parse_byte_size("4K"), Ok(4096));
        assert_eq!(parse_byte_size("1m"), Ok(1 << 20));
        assert_eq!(parse_byte_size("2GiB"), Ok(2 << 30));
        assert_eq!(parse_byte_size(" 3 MB "), Ok(3 << 20));
        assert!(parse_byte_size("").is_err());
        assert!(parse_byte_size("K").is_err());
        assert!(parse_byte_size("10T").is_err());
    }

    #[test]
    fn test_default_threads_has_floor_of_one() {
        assert!(default_threads() >= 1);
        assert_eq!(
            PerformanceConfig::default().effective_threads(),
            default_threads()
        );
    }

    #[test]
    fn test_small_inputs_stay_sequential() {
        let perf = PerformanceConfig {
            threads: 4,
            small_input_bytes: 100,
            ..Default::default()
        };
        assert!(!perf.should_use_parallel(99));
        assert!(perf.should_use_parallel(100));

        let single = PerformanceConfig {
            threads: 1,
            small_input_bytes: 0,
            ..Default::default()
        };
        assert!(!single.should_use_parallel(1 << 30));
    }

    #[test]
    fn test_validate_rejects_inverted_chunk_bounds() {
        let mut config = KeystatConfig::default();
        config.performance.min_chunk_bytes = 10;
        config.performance.max_chunk_bytes = 5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.performance.min_chunk_bytes = 0;
        assert!(config.validate().is_err());

        assert!(KeystatConfig::default().validate().is_ok());
    }
}
