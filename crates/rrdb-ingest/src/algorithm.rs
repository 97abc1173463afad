//! The four collection algorithms a dimension can declare (§4.3).

use std::fmt;
use std::str::FromStr;

/// How a dimension's raw collected values are turned into calculated
/// (per-tick, pre-interpolation) values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// `calc = collected * multiplier / divisor`. No memory of the previous
    /// sample.
    Absolute,
    /// `calc = (collected - last_collected) * multiplier / divisor`. Detects
    /// counter resets (and, if the collector declares a counter width,
    /// overflow wraps).
    Incremental,
    /// `calc = 100 * (collected - last_collected) / sum_of_all_deltas_in_chart`,
    /// computed across every updated dimension of the chart in the same tick.
    PcentOverDiffTotal,
    /// `calc = 100 * collected / sum_of_all_collected_in_chart`, computed
    /// across every updated dimension of the chart in the same tick.
    PcentOverRowTotal,
}

impl Algorithm {
    /// True if this algorithm needs a chart-wide first pass (the two
    /// percentage algorithms) before any dimension's `calc` is known.
    #[must_use]
    pub fn needs_chart_total(self) -> bool {
        matches!(self, Self::PcentOverDiffTotal | Self::PcentOverRowTotal)
    }

    /// True if this algorithm carries state across ticks (needs a previous
    /// collected value to compute anything).
    #[must_use]
    pub fn is_incremental_style(self) -> bool {
        matches!(self, Self::Incremental | Self::PcentOverDiffTotal)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absolute => "absolute",
            Self::Incremental => "incremental",
            Self::PcentOverDiffTotal => "pcent-over-diff-total",
            Self::PcentOverRowTotal => "pcent-over-row-total",
        })
    }
}

/// Returned when a collector names an algorithm rrdb doesn't recognize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub String);

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown algorithm {:?}", self.0)
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absolute" => Ok(Self::Absolute),
            "incremental" => Ok(Self::Incremental),
            "pcent-over-diff-total" => Ok(Self::PcentOverDiffTotal),
            "pcent-over-row-total" => Ok(Self::PcentOverRowTotal),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_from_str() {
        for a in [
            Algorithm::Absolute,
            Algorithm::Incremental,
            Algorithm::PcentOverDiffTotal,
            Algorithm::PcentOverRowTotal,
        ] {
            let parsed: Algorithm = a.to_string().parse().unwrap();
            assert_eq!(parsed, a);
        }
    }

    #[test]
    fn rejects_unknown_names() {
        assert!("made-up-algorithm".parse::<Algorithm>().is_err());
    }
}
