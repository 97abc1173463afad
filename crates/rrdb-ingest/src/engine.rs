//! The `done()` commit flow (§4.3): turns whatever got `set()` this tick into
//! zero or more interpolated grid slots, for every dimension of one chart at
//! once.

use crate::algorithm::Algorithm;
use crate::dimension::Dimension;
use rrdb_core::{Ring, StorageFlags, StorageNumber, TimeGrid};
use tracing::{debug, trace, warn};

/// One dimension's ring alongside its ingestion state, paired up for a
/// commit. The registry owns both; this is just a borrow for the duration of
/// `done()`.
pub struct DimensionSlot<'a> {
    pub dim: &'a mut Dimension,
    pub ring: &'a Ring,
}

/// What a single `done()` call did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub slots_written: u64,
    pub gap_suppressed: bool,
    pub bootstrapped: bool,
}

/// Commits the current tick for every dimension of one chart.
///
/// `t_prev_usec` is the chart's `last_collected_time` before this call (the
/// instant the interpolation fraction measures from); `t_now_usec` is the new
/// sample instant just staged by `set()`/`next_usec()`. On the very first
/// commit of a chart's lifetime, pass `t_prev_usec == t_now_usec`.
pub fn done(
    grid: &TimeGrid,
    dims: &mut [DimensionSlot<'_>],
    t_prev_usec: i64,
    t_now_usec: i64,
    gap_when_lost_iterations_above: u32,
) -> CommitReport {
    let update_every = i64::from(grid.update_every());
    let t_now_sec = t_now_usec.div_euclid(1_000_000);

    let mut bootstrapped = false;
    if grid.last_updated().is_none() {
        let t_last = (t_now_sec.div_euclid(update_every) * update_every) - update_every;
        grid.prime(t_last);
        bootstrapped = true;
        debug!(t_last, "bootstrapping chart time grid");
    }

    let t_last_sec = grid.last_entry_t();
    if t_now_sec < t_last_sec {
        warn!(t_now_sec, t_last_sec, "commit time does not advance the grid, writing no slots");
    }

    let mut k = (t_now_sec - t_last_sec).max(0) / update_every;
    let entries = grid.entries() as u64;
    if k as u64 > entries {
        warn!(slots = k, entries, "tick spans more slots than the ring holds, truncating");
        k = entries as i64;
    }

    // Chart-wide totals for the percentage algorithms, computed once up
    // front from every updated dimension regardless of its own algorithm.
    let plain_dims: Vec<Dimension> = dims.iter().map(|s| s.dim.clone()).collect();
    let diff_total = Dimension::chart_total_component(&plain_dims, Algorithm::PcentOverDiffTotal);
    let row_total = Dimension::chart_total_component(&plain_dims, Algorithm::PcentOverRowTotal);

    let gap = gap_when_lost_iterations_above > 0 && k > i64::from(gap_when_lost_iterations_above);

    let cursor = grid.current_entry_raw();
    for slot in &mut *dims {
        let chart_total = match slot.dim.algorithm {
            Algorithm::PcentOverDiffTotal => diff_total,
            Algorithm::PcentOverRowTotal => row_total,
            Algorithm::Absolute | Algorithm::Incremental => 0.0,
        };

        let (calc, reset, overflow) = match slot.dim.tick_calc(chart_total) {
            Some(v) => v,
            // Not updated this tick: hold the last value flat.
            None => (slot.dim.last_calculated_value(), false, false),
        };
        let flags = StorageFlags { reset, overflow };
        let last_calc = slot.dim.last_calculated_value();

        let mut write_cursor = cursor;
        for j in 1..=k {
            let packed = if j == k {
                StorageNumber::pack(calc, flags)
            } else if gap {
                // Suppressed: rrdb has no idea what happened during the
                // missed iterations, so it leaves the gap genuinely unknown
                // rather than guessing with a straight line.
                StorageNumber::EMPTY
            } else {
                let t_j_usec = (t_last_sec + j * update_every) * 1_000_000;
                let span = (t_now_usec - t_prev_usec) as f64;
                let f = if span > 0.0 {
                    ((t_j_usec - t_prev_usec) as f64 / span).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                let value = last_calc + (calc - last_calc) * f;
                StorageNumber::pack(value, StorageFlags::default())
            };
            slot.ring.write(write_cursor, packed);
            write_cursor = (write_cursor + 1) % grid.entries();
        }

        slot.dim.roll(calc);
    }

    let new_last_updated = t_last_sec + k * update_every;
    grid.advance(k as u64, new_last_updated);

    trace!(slots = k, gap, "committed tick");
    CommitReport {
        slots_written: k as u64,
        gap_suppressed: gap,
        bootstrapped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Algorithm;

    fn tick(
        grid: &TimeGrid,
        dim: &mut Dimension,
        ring: &Ring,
        t_prev: i64,
        t_now: i64,
        gap_above: u32,
    ) -> CommitReport {
        let mut slots = [DimensionSlot { dim, ring }];
        done(grid, &mut slots, t_prev, t_now, gap_above)
    }

    #[test]
    fn bootstrap_writes_exact_calc_to_one_slot() {
        let grid = TimeGrid::new(1, 10);
        let ring = Ring::new(10);
        let mut dim = Dimension::new(Algorithm::Absolute, 1, 1);
        dim.set(500, 1_000_000);

        let report = tick(&grid, &mut dim, &ring, 1_000_000, 1_000_000, 0);
        assert!(report.bootstrapped);
        assert_eq!(report.slots_written, 1);

        let (value, _) = ring.read(grid.last_slot()).unpack();
        assert!((value - 500.0).abs() < 0.01);
    }

    #[test]
    fn catch_up_interpolates_across_missed_slots() {
        let grid = TimeGrid::new(1, 10);
        let ring = Ring::new(10);
        let mut dim = Dimension::new(Algorithm::Absolute, 1, 1);

        dim.set(0, 0);
        tick(&grid, &mut dim, &ring, 0, 0, 0);

        // Four seconds pass with no intermediate samples; the collector
        // reports once at t=4_000_000us with value 40.
        dim.set(40, 4_000_000);
        let report = tick(&grid, &mut dim, &ring, 0, 4_000_000, 0);
        assert_eq!(report.slots_written, 4);

        let last = grid.last_slot();
        let (exact, _) = ring.read(last).unpack();
        assert!((exact - 40.0).abs() < 0.01, "exact={exact}");

        // Earlier interpolated slots should increase monotonically toward
        // the exact endpoint.
        let first = grid.first_slot();
        let (early, _) = ring.read(first).unpack();
        assert!(early < exact);
    }

    #[test]
    fn incremental_reset_is_reported_and_rebases() {
        let grid = TimeGrid::new(1, 10);
        let ring = Ring::new(10);
        let mut dim = Dimension::new(Algorithm::Incremental, 1, 1);

        dim.set(1000, 1_000_000);
        tick(&grid, &mut dim, &ring, 1_000_000, 1_000_000, 0);

        dim.set(1500, 2_000_000);
        tick(&grid, &mut dim, &ring, 1_000_000, 2_000_000, 0);
        let (v, flags) = ring.read(grid.last_slot()).unpack();
        assert!((v - 500.0).abs() < 0.01);
        assert!(!flags.reset);

        // Counter wraps backward: this looks like a reset.
        dim.set(10, 3_000_000);
        tick(&grid, &mut dim, &ring, 2_000_000, 3_000_000, 0);
        let (v, flags) = ring.read(grid.last_slot()).unpack();
        assert!(v.is_nan());
        assert!(flags.reset);

        // Next tick rebases cleanly from the post-reset baseline.
        dim.set(60, 4_000_000);
        tick(&grid, &mut dim, &ring, 3_000_000, 4_000_000, 0);
        let (v, flags) = ring.read(grid.last_slot()).unpack();
        assert!((v - 50.0).abs() < 0.01);
        assert!(!flags.reset);
    }

    #[test]
    fn gap_above_threshold_suppresses_interpolation() {
        let grid = TimeGrid::new(1, 20);
        let ring = Ring::new(20);
        let mut dim = Dimension::new(Algorithm::Absolute, 1, 1);

        dim.set(0, 0);
        tick(&grid, &mut dim, &ring, 0, 0, 2);

        // Ten seconds pass with no samples; only 2 lost iterations are
        // tolerated before rrdb gives up on interpolation.
        dim.set(100, 10_000_000);
        let report = tick(&grid, &mut dim, &ring, 0, 10_000_000, 2);
        assert!(report.gap_suppressed);

        let last = grid.last_slot();
        let (exact, _) = ring.read(last).unpack();
        assert!((exact - 100.0).abs() < 0.01);

        let mid_slot = (last + grid.entries() - 5) % grid.entries();
        assert!(ring.read(mid_slot).is_empty());
    }
}
