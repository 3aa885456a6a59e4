//! Rendering of the final aggregate as sorted `key=min/mean/max` lines.

use std::cmp::Ordering;

use crate::aggregate::{AggregateMap, PartialStat};
use crate::config::{KeyOrder, RoundingMode};

/// Output formatting options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    pub rounding: RoundingMode,
    pub key_order: KeyOrder,
}

// From 2^52 up every f64 is an integer; scaling those by 10 gains nothing
// and overflows to infinity near f64::MAX.
const INTEGRAL_THRESHOLD: f64 = 4_503_599_627_370_496.0;

/// `ceil(x * 10) / 10`: rounds toward positive infinity at the tenths place.
pub fn round_up_to_one_decimal(x: f64) -> f64 {
    if x.abs() >= INTEGRAL_THRESHOLD {
        return x;
    }
    normalize_zero((x * 10.0).ceil() / 10.0)
}

/// Nearest tenth with ties going to the even tenth.
pub fn round_half_even_to_one_decimal(x: f64) -> f64 {
    if x.abs() >= INTEGRAL_THRESHOLD {
        return x;
    }
    normalize_zero((x * 10.0).round_ties_even() / 10.0)
}

// -0.0 would print as "-0.0"
fn normalize_zero(x: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x
    }
}

impl RoundingMode {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            RoundingMode::Ceil => round_up_to_one_decimal(x),
            RoundingMode::HalfEven => round_half_even_to_one_decimal(x),
        }
    }
}

impl KeyOrder {
    pub fn compare(self, a: &[u8], b: &[u8]) -> Ordering {
        match self {
            KeyOrder::Ordinal => a.cmp(b),
            KeyOrder::CaseInsensitive => a
                .iter()
                .map(u8::to_ascii_lowercase)
                .cmp(b.iter().map(u8::to_ascii_lowercase))
                .then_with(|| a.cmp(b)),
        }
    }
}

/// Formats one key's stat as a line (without the trailing newline).
pub fn format_line(key: &[u8], stat: &PartialStat, rounding: RoundingMode) -> Vec<u8> {
    let mut line = Vec::with_capacity(key.len() + 24);
    line.extend_from_slice(key);
    line.extend_from_slice(
        format!(
            "={:.1}/{:.1}/{:.1}",
            rounding.apply(stat.min),
            rounding.apply(stat.mean()),
            rounding.apply(stat.max)
        )
        .as_bytes(),
    );
    line
}

/// Sorted output lines for the whole map. Pure: the same map always
/// produces the same bytes.
pub fn format_map(map: &AggregateMap, options: FormatOptions) -> Vec<Vec<u8>> {
    let mut entries: Vec<(&Vec<u8>, &PartialStat)> = map.iter().collect();
    entries.sort_unstable_by(|a, b| options.key_order.compare(a.0, b.0));
    entries
        .into_iter()
        .map(|(key, stat)| format_line(key, stat, options.rounding))
        .collect()
}
