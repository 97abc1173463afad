//! A registry-owned dimension: a [`rrdb_core::Ring`] plus the ingestion
//! state that turns raw samples into what gets written to it.

use parking_lot::Mutex;
use rrdb_core::Ring;
use rrdb_ingest::{Algorithm, CounterWidth, Dimension as IngestDimension};
use std::sync::atomic::{AtomicBool, Ordering};

/// One dimension of a chart: stable id, a display name that can be renamed,
/// the value ring, and the ingestion state `set()`/`done()` operate on.
pub struct Dimension {
    pub id: String,
    name: Mutex<String>,
    ring: Ring,
    state: Mutex<IngestDimension>,
    hidden: AtomicBool,
    obsolete: AtomicBool,
    /// Set once the streamer has forwarded this dimension to a parent;
    /// distinct from `hidden`, which only affects local display.
    exposed: AtomicBool,
}

impl Dimension {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        algorithm: Algorithm,
        multiplier: i64,
        divisor: i64,
        entries: usize,
    ) -> Self {
        Self {
            id: id.into(),
            name: Mutex::new(name.into()),
            ring: Ring::new(entries),
            state: Mutex::new(IngestDimension::new(algorithm, multiplier, divisor)),
            hidden: AtomicBool::new(false),
            obsolete: AtomicBool::new(false),
            exposed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub fn rename(&self, new_name: impl Into<String>) {
        *self.name.lock() = new_name.into();
    }

    #[must_use]
    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub(crate) fn state(&self) -> &Mutex<IngestDimension> {
        &self.state
    }

    /// Stages a raw sample. See [`rrdb_ingest::Dimension::set`].
    pub fn set(&self, collected_value: i64, now_usec: i64) {
        self.state.lock().set(collected_value, now_usec);
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::Acquire)
    }

    pub fn hide(&self) {
        self.hidden.store(true, Ordering::Release);
    }

    pub fn unhide(&self) {
        self.hidden.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_obsolete(&self) -> bool {
        self.obsolete.load(Ordering::Acquire)
    }

    pub fn mark_obsolete(&self) {
        self.obsolete.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_exposed(&self) -> bool {
        self.exposed.load(Ordering::Acquire)
    }

    pub fn mark_exposed(&self) {
        self.exposed.store(true, Ordering::Release);
    }

    pub fn set_counter_width(&self, width: Option<CounterWidth>) {
        self.state.lock().counter_width = width;
    }

    pub fn set_dont_detect_resets_or_overflows(&self, dont_detect: bool) {
        self.state.lock().dont_detect_resets_or_overflows = dont_detect;
    }

    #[must_use]
    pub fn last_calculated_value(&self) -> f64 {
        self.state.lock().last_calculated_value()
    }

    #[must_use]
    pub fn multiplier(&self) -> i64 {
        self.state.lock().multiplier
    }

    #[must_use]
    pub fn divisor(&self) -> i64 {
        self.state.lock().divisor
    }

    /// Overwrites this dimension's ring contents wholesale, for the
    /// persistence load path. Does not touch the ingestion baseline
    /// (`last_collected_value`/`has_baseline`): the first sample collected
    /// after a reload always re-establishes it, the same as it would for a
    /// freshly created dimension.
    pub fn restore_ring(&self, values: &[i32]) {
        self.ring.restore_raw(values);
    }
}
