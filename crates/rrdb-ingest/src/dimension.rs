//! Per-dimension ingestion state: the staging area `set()` writes into and
//! `done()` consumes, plus the bookkeeping `done()` rolls forward each tick.

use crate::algorithm::Algorithm;

/// The width of a collector's native counter, used only to detect overflow
/// wraps on [`Algorithm::Incremental`] dimensions. `None` disables overflow
/// detection (resets are still detected unconditionally).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterWidth {
    Bits32,
    Bits64,
}

impl CounterWidth {
    fn max_value(self) -> i128 {
        match self {
            Self::Bits32 => i128::from(u32::MAX),
            Self::Bits64 => i128::from(u64::MAX),
        }
    }
}

/// The collection parameters and rolling state of one dimension, owned by
/// whatever holds its [`rrdb_core::Ring`] (the registry's `Dimension`).
#[derive(Debug, Clone)]
pub struct Dimension {
    pub algorithm: Algorithm,
    pub multiplier: i64,
    pub divisor: i64,
    pub dont_detect_resets_or_overflows: bool,
    pub counter_width: Option<CounterWidth>,

    /// `true` once `set()` has staged a fresh raw sample this tick.
    updated: bool,
    /// Raw value staged by `set()` for the in-progress tick.
    collected_value: i64,
    /// `last_collected_time` in microseconds, may lag the chart's own clock.
    last_collected_time_usec: i64,

    /// Whether any sample has ever been collected (baseline for incremental).
    has_baseline: bool,
    last_collected_value: i64,
    last_calculated_value: f64,

    /// Running volume counters, exposed for diagnostics/export (§4.3 notes
    /// these as bookkeeping only; rrdb does not interpret them further).
    pub collected_volume: f64,
    pub stored_volume: f64,
}

impl Dimension {
    #[must_use]
    pub fn new(algorithm: Algorithm, multiplier: i64, divisor: i64) -> Self {
        debug_assert!(divisor != 0, "divisor must be non-zero, caller must validate at the registry boundary");
        Self {
            algorithm,
            multiplier,
            divisor,
            dont_detect_resets_or_overflows: false,
            counter_width: None,
            updated: false,
            collected_value: 0,
            last_collected_time_usec: 0,
            has_baseline: false,
            last_collected_value: 0,
            last_calculated_value: 0.0,
            collected_volume: 0.0,
            stored_volume: 0.0,
        }
    }

    #[must_use]
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    #[must_use]
    pub fn last_collected_time_usec(&self) -> i64 {
        self.last_collected_time_usec
    }

    /// Stages a raw sample for the in-progress tick. Overwrites any sample
    /// already staged this tick (collectors that call `set()` more than once
    /// before `done()` only have the last call honored, matching a single
    /// absolute-value reading per tick).
    pub fn set(&mut self, collected_value: i64, now_usec: i64) {
        self.collected_value = collected_value;
        self.last_collected_time_usec = now_usec;
        self.updated = true;
    }

    /// Per-dimension raw delta used both by `Incremental` and by the two
    /// percentage algorithms' chart-wide first pass. Returns `(delta, reset,
    /// overflow)`. Only meaningful when `is_updated()` and `has_baseline`.
    fn incremental_delta(&self) -> (i64, bool, bool) {
        let raw = self.collected_value - self.last_collected_value;
        if raw >= 0 {
            return (raw, false, false);
        }
        if self.dont_detect_resets_or_overflows {
            return (raw, false, false);
        }
        if let Some(width) = self.counter_width {
            let wrapped = width.max_value() - i128::from(self.last_collected_value)
                + i128::from(self.collected_value)
                + 1;
            if wrapped >= 0 && wrapped <= width.max_value() {
                return (wrapped as i64, false, true);
            }
        }
        (0, true, false)
    }

    /// The chart-wide total this dimension contributes to a percentage
    /// algorithm's denominator, before the first pass divides. Returns `0.0`
    /// if this dimension isn't updated this tick (contributes nothing).
    fn percentage_component(&self) -> f64 {
        if !self.updated {
            return 0.0;
        }
        match self.algorithm {
            Algorithm::PcentOverDiffTotal => {
                if self.has_baseline {
                    let (delta, reset, _) = self.incremental_delta();
                    if reset {
                        0.0
                    } else {
                        delta as f64
                    }
                } else {
                    0.0
                }
            }
            Algorithm::PcentOverRowTotal => self.collected_value as f64,
            Algorithm::Absolute | Algorithm::Incremental => 0.0,
        }
    }

    /// Computes this tick's `calc` (and its flags), given the chart-wide
    /// percentage denominator already summed across every dimension (ignored
    /// by non-percentage algorithms). Returns `None` if this dimension wasn't
    /// updated this tick — the caller decides what to do (rrdb holds the
    /// value flat, see [`crate::engine`]).
    pub(crate) fn tick_calc(&mut self, chart_total: f64) -> Option<(f64, bool, bool)> {
        if !self.updated {
            return None;
        }

        let (calc, reset, overflow) = match self.algorithm {
            Algorithm::Absolute => {
                let v = (self.collected_value as f64 * self.multiplier as f64) / self.divisor as f64;
                (v, false, false)
            }
            Algorithm::Incremental => {
                if !self.has_baseline {
                    (f64::NAN, false, false)
                } else {
                    let (delta, reset, overflow) = self.incremental_delta();
                    if reset {
                        (f64::NAN, true, false)
                    } else {
                        let v = (delta as f64 * self.multiplier as f64) / self.divisor as f64;
                        (v, false, overflow)
                    }
                }
            }
            Algorithm::PcentOverDiffTotal => {
                if !self.has_baseline {
                    (f64::NAN, false, false)
                } else {
                    let (delta, reset, _) = self.incremental_delta();
                    if reset {
                        (f64::NAN, true, false)
                    } else if chart_total == 0.0 {
                        (f64::NAN, false, false)
                    } else {
                        (100.0 * delta as f64 / chart_total, false, false)
                    }
                }
            }
            Algorithm::PcentOverRowTotal => {
                if chart_total == 0.0 {
                    (f64::NAN, false, false)
                } else {
                    (100.0 * self.collected_value as f64 / chart_total, false, false)
                }
            }
        };

        if calc.is_finite() {
            self.collected_volume += calc.abs();
        }
        Some((calc, reset, overflow))
    }

    /// Post-commit bookkeeping shared by every dimension regardless of
    /// whether it was updated this tick (§4.3 step 6).
    pub(crate) fn roll(&mut self, calc: f64) {
        if self.updated {
            self.last_collected_value = self.collected_value;
            self.has_baseline = true;
        }
        if calc.is_finite() {
            self.last_calculated_value = calc;
            self.stored_volume += calc.abs();
        }
        self.updated = false;
    }

    #[must_use]
    pub fn last_calculated_value(&self) -> f64 {
        self.last_calculated_value
    }

    pub(crate) fn chart_total_component(dims: &[Dimension], algorithm: Algorithm) -> f64 {
        dims.iter()
            .filter(|d| d.algorithm == algorithm)
            .map(Dimension::percentage_component)
            .sum()
    }
}
