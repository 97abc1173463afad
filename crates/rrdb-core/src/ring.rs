//! Per-dimension round-robin ring and the time↔slot mapping arithmetic.
//!
//! Two separate, deliberately small structures model §4.2 of the spec:
//!
//! - [`TimeGrid`] owns the clock: cadence, depth, write cursor, and the
//!   timestamp of the most recently committed slot. All dimensions of a
//!   chart share one `TimeGrid`, since slot `N` means the same grid instant
//!   for every dimension of that chart.
//! - [`Ring`] owns only the fixed-capacity array of packed values for a
//!   single dimension. Slot writes are plain atomic stores so that a reader
//!   iterating dimensions concurrently with a `done()` commit never observes
//!   a torn value (only ever the old or the new one).

use crate::storage::StorageNumber;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU64, AtomicUsize, Ordering};

/// The shared clock of a chart: cadence, depth, write cursor, last commit.
#[derive(Debug)]
pub struct TimeGrid {
    update_every: u32,
    entries: usize,
    current_entry: AtomicUsize,
    counter: AtomicU64,
    counter_done: AtomicU64,
    /// 0 means "no tick has committed yet".
    last_updated: AtomicI64,
}

impl TimeGrid {
    /// Creates a fresh grid. `entries` must be at least 1 and `update_every`
    /// at least 1; callers are expected to have validated these against the
    /// bounds in the registry before construction (`[1, 864_000]` slots,
    /// `[1, 3600]` seconds cadence).
    #[must_use]
    pub fn new(update_every: u32, entries: usize) -> Self {
        debug_assert!(entries >= 1, "a ring must have at least one slot, caller must validate bounds");
        debug_assert!(update_every >= 1, "cadence must be at least one second, caller must validate bounds");
        Self {
            update_every,
            entries,
            current_entry: AtomicUsize::new(0),
            counter: AtomicU64::new(0),
            counter_done: AtomicU64::new(0),
            last_updated: AtomicI64::new(0),
        }
    }

    /// Restores a grid from persisted header fields (§4.5 load path).
    #[must_use]
    pub fn from_parts(
        update_every: u32,
        entries: usize,
        current_entry: usize,
        counter: u64,
        last_updated: i64,
    ) -> Self {
        Self {
            update_every,
            entries,
            current_entry: AtomicUsize::new(current_entry),
            counter: AtomicU64::new(counter),
            counter_done: AtomicU64::new(0),
            last_updated: AtomicI64::new(last_updated),
        }
    }

    #[must_use]
    pub fn update_every(&self) -> u32 {
        self.update_every
    }

    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries
    }

    #[must_use]
    pub fn current_entry(&self) -> usize {
        self.current_entry.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn counter(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn counter_done(&self) -> u64 {
        self.counter_done.load(Ordering::Acquire)
    }

    /// The timestamp of the most recently committed slot, or `None` if no
    /// tick has committed yet.
    #[must_use]
    pub fn last_updated(&self) -> Option<i64> {
        let l = self.last_updated.load(Ordering::Acquire);
        (l != 0).then_some(l)
    }

    /// The slot holding the most recent value.
    #[must_use]
    pub fn last_slot(&self) -> usize {
        let c = self.current_entry();
        if c == 0 {
            self.entries - 1
        } else {
            c - 1
        }
    }

    /// The oldest slot currently holding a value (`0` until the ring fills).
    #[must_use]
    pub fn first_slot(&self) -> usize {
        if self.counter() < self.entries as u64 {
            0
        } else {
            self.current_entry()
        }
    }

    /// Seconds spanned by the slots currently populated.
    #[must_use]
    pub fn duration(&self) -> i64 {
        let populated = self.counter().min(self.entries as u64);
        populated as i64 * i64::from(self.update_every)
    }

    #[must_use]
    pub fn last_entry_t(&self) -> i64 {
        self.last_updated.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn first_entry_t(&self) -> i64 {
        self.last_entry_t() - self.duration()
    }

    /// Maps a wall-clock timestamp to a slot index, clamping `t` into
    /// `[first_entry_t, last_entry_t]` first.
    #[must_use]
    pub fn time2slot(&self, t: i64) -> usize {
        let last = self.last_entry_t();
        let first = self.first_entry_t();
        let t = t.clamp(first, last);
        let offset = (last - t) / i64::from(self.update_every);
        let last_slot = self.last_slot() as i64;
        let entries = self.entries as i64;
        (last_slot - offset).rem_euclid(entries) as usize
    }

    /// Maps a slot index back to its grid timestamp.
    #[must_use]
    pub fn slot2time(&self, slot: usize) -> i64 {
        let last_slot = self.last_slot() as i64;
        let entries = self.entries as i64;
        let steps_back = (last_slot - slot as i64).rem_euclid(entries);
        self.last_entry_t() - i64::from(self.update_every) * steps_back
    }

    /// Advances the write cursor by `n` slots (possibly zero) and publishes
    /// `new_last_updated`. `counter_done` increments on every call, matching
    /// the chart's "total tick commits" semantics: every `done()` call is one
    /// commit, whether or not it produced a new slot. Single-writer: callers
    /// must guarantee only one thread ever commits a given chart (rrdb-ingest
    /// is the only intended caller).
    pub fn advance(&self, n: u64, new_last_updated: i64) {
        if n > 0 {
            let entries = self.entries as u64;
            let new_entry = (self.current_entry() as u64 + n) % entries;
            self.current_entry.store(new_entry as usize, Ordering::Release);
            self.counter.fetch_add(n, Ordering::AcqRel);
            self.last_updated.store(new_last_updated, Ordering::Release);
        }
        self.counter_done.fetch_add(1, Ordering::AcqRel);
    }

    /// Sets the initial grid instant before any slot has been written
    /// (bootstrap step of §4.3). Single-writer, same caller contract as
    /// [`TimeGrid::advance`].
    pub fn prime(&self, last_updated: i64) {
        self.last_updated.store(last_updated, Ordering::Release);
    }

    /// The raw write cursor, used by the ingestion engine to pick slots to
    /// write without re-deriving it from a possibly-stale read.
    #[must_use]
    pub fn current_entry_raw(&self) -> usize {
        self.current_entry.load(Ordering::Relaxed)
    }

    /// Overwrites the grid's clock fields wholesale, for the persistence
    /// load path. Single-writer, same caller contract as
    /// [`TimeGrid::advance`]: must only be called before the chart is
    /// visible to any collector thread.
    pub fn restore(&self, current_entry: usize, counter: u64, last_updated: i64) {
        self.current_entry.store(current_entry, Ordering::Release);
        self.counter.store(counter, Ordering::Release);
        self.last_updated.store(last_updated, Ordering::Release);
    }
}

/// Fixed-capacity circular array of packed storage numbers for one dimension.
pub struct Ring {
    slots: Box<[AtomicI32]>,
}

impl Ring {
    /// Creates a ring with `entries` slots, all initialized to
    /// [`StorageNumber::EMPTY`].
    #[must_use]
    pub fn new(entries: usize) -> Self {
        let slots = (0..entries)
            .map(|_| AtomicI32::new(StorageNumber::EMPTY.to_raw()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }

    /// Restores a ring from raw bits read back from a mapped file.
    #[must_use]
    pub fn from_raw_values(values: &[i32]) -> Self {
        let slots = values
            .iter()
            .map(|&v| AtomicI32::new(v))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }

    #[must_use]
    pub fn entries(&self) -> usize {
        self.slots.len()
    }

    /// Atomically publishes a value into `slot`. The store is `Release` so a
    /// concurrent reader's `Acquire` load of the same word never observes a
    /// torn write.
    pub fn write(&self, slot: usize, value: StorageNumber) {
        self.slots[slot].store(value.to_raw(), Ordering::Release);
    }

    /// Atomically reads the value at `slot`.
    #[must_use]
    pub fn read(&self, slot: usize) -> StorageNumber {
        StorageNumber::from_raw(self.slots[slot].load(Ordering::Acquire))
    }

    /// A snapshot of the raw bits, for persistence.
    #[must_use]
    pub fn snapshot_raw(&self) -> Vec<i32> {
        self.slots.iter().map(|s| s.load(Ordering::Acquire)).collect()
    }

    /// Overwrites every slot from `values`, for the persistence load path.
    /// Extra values are ignored; a short `values` leaves the remaining
    /// tail slots untouched (still [`StorageNumber::EMPTY`] from `new()`).
    pub fn restore_raw(&self, values: &[i32]) {
        for (slot, &v) in self.slots.iter().zip(values.iter()) {
            slot.store(v, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(update_every: u32, entries: usize) -> TimeGrid {
        TimeGrid::new(update_every, entries)
    }

    #[test]
    fn bootstrap_single_commit() {
        let g = grid(1, 10);
        g.advance(1, 100);
        assert_eq!(g.counter(), 1);
        assert_eq!(g.current_entry(), 1);
        assert_eq!(g.last_slot(), 0);
        assert_eq!(g.first_slot(), 0);
        assert_eq!(g.last_entry_t(), 100);
    }

    #[test]
    fn ring_wrap_matches_scenario_3() {
        let g = grid(1, 4);
        for (i, t) in [1, 2, 3, 4, 5].into_iter().enumerate() {
            g.advance(1, t);
            let _ = i;
        }
        assert_eq!(g.current_entry(), 1);
        assert_eq!(g.last_entry_t() - 3, g.first_entry_t());
    }

    #[test]
    fn time2slot_slot2time_round_trip() {
        let g = grid(1, 10);
        for t in 1..=20 {
            g.advance(1, t);
        }
        for s in 0..g.entries().min(g.counter() as usize) {
            let t = g.slot2time(s);
            assert_eq!(g.time2slot(t), s, "slot {s} time {t}");
        }
    }

    #[test]
    fn slot2time_within_one_cadence_of_query() {
        let g = grid(2, 5);
        for t in [2, 4, 6, 8, 10] {
            g.advance(1, t);
        }
        for t in g.first_entry_t()..=g.last_entry_t() {
            let slot = g.time2slot(t);
            let back = g.slot2time(slot);
            assert!(back <= t && back > t - i64::from(g.update_every()));
        }
    }

    #[test]
    fn ring_read_write_round_trip() {
        let ring = Ring::new(4);
        ring.write(0, StorageNumber::pack_plain(5.0));
        ring.write(1, StorageNumber::pack_plain(9.0));
        let (v0, _) = ring.read(0).unpack();
        let (v1, _) = ring.read(1).unpack();
        assert!((v0 - 5.0).abs() < 0.01);
        assert!((v1 - 9.0).abs() < 0.01);
        assert!(ring.read(2).is_empty());
    }
}
