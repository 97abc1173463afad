//! A chart: one shared [`rrdb_core::TimeGrid`] and the dimensions that write
//! into it every tick (§3, §4.4).

use crate::dimension::Dimension;
use crate::error::RegistryError;
use crate::naming::{disambiguate, sanitize};
use parking_lot::{Mutex, RwLock};
use rrdb_core::TimeGrid;
use rrdb_ingest::{Algorithm, CommitReport, DimensionSlot};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// How a chart's dimensions are rendered relative to each other. Purely a
/// display hint; nothing in this crate branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Line,
    Area,
    Stacked,
}

/// A chart: a family of dimensions sharing one cadence and one ring depth.
pub struct Chart {
    pub id: String,
    pub type_: String,
    pub context: String,
    pub units: String,
    pub priority: i32,
    name: RwLock<String>,
    family: RwLock<String>,
    title: RwLock<String>,
    kind: RwLock<ChartKind>,
    cache_dir: RwLock<Option<String>>,
    pub grid: TimeGrid,
    dims_by_id: RwLock<HashMap<String, Arc<Dimension>>>,
    /// Insertion order, so `done()` iterates dimensions deterministically
    /// (and so percentage algorithms sum in a stable order).
    dim_order: RwLock<Vec<String>>,
    /// 0 means "no sample collected yet"; mirrors `TimeGrid::last_updated`'s
    /// sentinel but tracks the chart's own collection clock, which seeds the
    /// grid's bootstrap rather than being derived from it.
    last_collected_time_usec: AtomicI64,
    obsolete: AtomicBool,
    /// Whether this chart is currently enabled for collection/display.
    /// Disabling a chart doesn't stop `done()` from committing it; it only
    /// affects [`Chart::viewable`] (§6).
    enabled: AtomicBool,
    /// Extra detail requested for this chart (e.g. a drill-down view).
    detail: AtomicBool,
    /// Verbose per-tick logging for this chart, independent of the process
    /// log level.
    debug: AtomicBool,
    /// Serializes `done()` calls: §5 requires at most one committer per
    /// chart at a time even though ring writes themselves are lock-free.
    commit_lock: Mutex<()>,
}

impl Chart {
    /// Validates `update_every`/`entries` against §6's bounds and constructs
    /// a chart. Any caller reaching this constructor directly (not just
    /// `Host::create_chart`) gets a typed error instead of a panic on an
    /// out-of-range cadence or ring depth.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        type_: impl Into<String>,
        name: impl Into<String>,
        family: impl Into<String>,
        context: impl Into<String>,
        units: impl Into<String>,
        priority: i32,
        update_every: u32,
        entries: usize,
    ) -> Result<Self, RegistryError> {
        if !(rrdb_core::UPDATE_EVERY_MIN..=rrdb_core::UPDATE_EVERY_MAX).contains(&update_every) {
            return Err(RegistryError::UpdateEveryOutOfRange {
                got: update_every,
                min: rrdb_core::UPDATE_EVERY_MIN,
                max: rrdb_core::UPDATE_EVERY_MAX,
            });
        }
        if !(rrdb_core::HISTORY_ENTRIES_MIN..=rrdb_core::HISTORY_ENTRIES_MAX).contains(&entries) {
            return Err(RegistryError::EntriesOutOfRange {
                got: entries,
                min: rrdb_core::HISTORY_ENTRIES_MIN,
                max: rrdb_core::HISTORY_ENTRIES_MAX,
            });
        }
        let name = name.into();
        Ok(Self {
            id: id.into(),
            type_: type_.into(),
            context: context.into(),
            units: units.into(),
            priority,
            title: RwLock::new(name.clone()),
            name: RwLock::new(name),
            family: RwLock::new(family.into()),
            kind: RwLock::new(ChartKind::default()),
            cache_dir: RwLock::new(None),
            grid: TimeGrid::new(update_every, entries),
            dims_by_id: RwLock::new(HashMap::new()),
            dim_order: RwLock::new(Vec::new()),
            last_collected_time_usec: AtomicI64::new(0),
            obsolete: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            detail: AtomicBool::new(false),
            debug: AtomicBool::new(false),
            commit_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub fn rename(&self, new_name: impl Into<String>) {
        *self.name.write() = new_name.into();
    }

    #[must_use]
    pub fn family(&self) -> String {
        self.family.read().clone()
    }

    #[must_use]
    pub fn title(&self) -> String {
        self.title.read().clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        *self.title.write() = title.into();
    }

    #[must_use]
    pub fn kind(&self) -> ChartKind {
        *self.kind.read()
    }

    pub fn set_kind(&self, kind: ChartKind) {
        *self.kind.write() = kind;
    }

    #[must_use]
    pub fn cache_dir(&self) -> Option<String> {
        self.cache_dir.read().clone()
    }

    pub fn set_cache_dir(&self, dir: impl Into<String>) {
        *self.cache_dir.write() = Some(dir.into());
    }

    #[must_use]
    pub fn is_detail(&self) -> bool {
        self.detail.load(Ordering::Acquire)
    }

    pub fn set_detail(&self, detail: bool) {
        self.detail.store(detail, Ordering::Release);
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Acquire)
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Release);
    }

    #[must_use]
    pub fn is_obsolete(&self) -> bool {
        self.obsolete.load(Ordering::Acquire)
    }

    pub fn mark_obsolete(&self) {
        self.obsolete.store(true, Ordering::Release);
        info!(chart = %self.id, "chart marked obsolete");
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// True iff this chart should be shown to a query/streaming client:
    /// enabled, not obsolete, and has at least one dimension (§6).
    #[must_use]
    pub fn viewable(&self) -> bool {
        self.is_enabled() && !self.is_obsolete() && !self.dims_by_id.read().is_empty()
    }

    #[must_use]
    pub fn last_collected_time_usec(&self) -> i64 {
        self.last_collected_time_usec.load(Ordering::Acquire)
    }

    /// Adds a dimension, returning the existing one unchanged if `raw_id`
    /// already names a dimension of this chart (duplicate-add is a no-op,
    /// matching `rrddim_add`'s find-or-create semantics). Fails if `divisor`
    /// is zero (§7: "divisor zero on add_dim fails the call").
    pub fn add_dim(
        &self,
        raw_id: &str,
        raw_name: &str,
        algorithm: Algorithm,
        multiplier: i64,
        divisor: i64,
    ) -> Result<Arc<Dimension>, RegistryError> {
        if divisor == 0 {
            return Err(RegistryError::ZeroDivisor);
        }
        let id = sanitize(raw_id);
        {
            let dims = self.dims_by_id.read();
            if let Some(existing) = dims.get(&id) {
                return Ok(Arc::clone(existing));
            }
        }

        let mut dims = self.dims_by_id.write();
        if let Some(existing) = dims.get(&id) {
            return Ok(Arc::clone(existing));
        }
        let name = disambiguate(&sanitize(raw_name), |candidate| {
            dims.values().any(|d| d.name() == candidate)
        });
        let dim = Arc::new(Dimension::new(
            id.clone(),
            name,
            algorithm,
            multiplier,
            divisor,
            self.grid.entries(),
        ));
        dims.insert(id.clone(), Arc::clone(&dim));
        self.dim_order.write().push(id);
        Ok(dim)
    }

    /// Like [`Chart::add_dim`], but a dimension already present under
    /// `raw_id` is reported as [`RegistryError::DuplicateDimension`] instead
    /// of being returned unchanged.
    pub fn add_dim_strict(
        &self,
        raw_id: &str,
        raw_name: &str,
        algorithm: Algorithm,
        multiplier: i64,
        divisor: i64,
    ) -> Result<Arc<Dimension>, RegistryError> {
        let id = sanitize(raw_id);
        if self.dims_by_id.read().contains_key(&id) {
            return Err(RegistryError::DuplicateDimension(id, self.id.clone()));
        }
        self.add_dim(raw_id, raw_name, algorithm, multiplier, divisor)
    }

    /// Like [`Chart::add_dim`], but takes the algorithm as a collector-
    /// supplied name (e.g. from a config file) rather than a typed
    /// [`Algorithm`], surfacing an unrecognized name as
    /// [`RegistryError::UnknownAlgorithm`].
    pub fn add_dim_named(
        &self,
        raw_id: &str,
        raw_name: &str,
        algorithm_name: &str,
        multiplier: i64,
        divisor: i64,
    ) -> Result<Arc<Dimension>, RegistryError> {
        let algorithm: Algorithm = algorithm_name.parse()?;
        self.add_dim(raw_id, raw_name, algorithm, multiplier, divisor)
    }

    #[must_use]
    pub fn find_dim(&self, id: &str) -> Option<Arc<Dimension>> {
        self.dims_by_id.read().get(id).cloned()
    }

    pub fn rename_dim(&self, id: &str, new_name: &str) -> Result<(), RegistryError> {
        let dim = self
            .find_dim(id)
            .ok_or_else(|| RegistryError::DimensionNotFound(id.to_string(), self.id.clone()))?;
        dim.rename(sanitize(new_name));
        Ok(())
    }

    /// Stages a raw sample for dimension `id`.
    pub fn set(&self, id: &str, collected_value: i64, now_usec: i64) -> Result<(), RegistryError> {
        let dim = self
            .find_dim(id)
            .ok_or_else(|| RegistryError::DimensionNotFound(id.to_string(), self.id.clone()))?;
        dim.set(collected_value, now_usec);
        Ok(())
    }

    /// Microseconds until the chart's next expected collection instant,
    /// clamped to `[0, update_every]`. Used by collectors to pace their own
    /// scheduling loop without drifting against the grid.
    #[must_use]
    pub fn next_usec(&self, now_usec: i64) -> i64 {
        let period = i64::from(self.grid.update_every()) * 1_000_000;
        self.next_usec_unfiltered(now_usec).clamp(0, period)
    }

    /// Like [`Chart::next_usec`] but not clamped: can go negative if the
    /// collector is already late, which callers can use to detect drift.
    #[must_use]
    pub fn next_usec_unfiltered(&self, now_usec: i64) -> i64 {
        let last = self.last_collected_time_usec();
        let period = i64::from(self.grid.update_every()) * 1_000_000;
        if last == 0 {
            return period;
        }
        (last + period) - now_usec
    }

    /// Commits the current tick across every dimension of this chart
    /// (§4.3). Takes the chart-wide commit lock for the duration, so
    /// concurrent `done()` calls on the same chart serialize; concurrent
    /// readers never block on it since ring reads are lock-free.
    pub fn done(&self, now_usec: i64, gap_when_lost_iterations_above: u32) -> CommitReport {
        let _guard = self.commit_lock.lock();

        let order = self.dim_order.read().clone();
        let dims = self.dims_by_id.read();
        let mut locked: Vec<_> = order
            .iter()
            .filter_map(|id| dims.get(id))
            .map(|d| (d.ring(), d.state().lock()))
            .collect();
        let mut slots: Vec<DimensionSlot<'_>> = locked
            .iter_mut()
            .map(|(ring, guard)| DimensionSlot {
                dim: &mut **guard,
                ring: *ring,
            })
            .collect();

        let last = self.last_collected_time_usec();
        let t_prev = if last == 0 { now_usec } else { last };

        let report = rrdb_ingest::done(&self.grid, &mut slots, t_prev, now_usec, gap_when_lost_iterations_above);
        drop(slots);
        drop(locked);
        self.last_collected_time_usec.store(now_usec, Ordering::Release);
        if report.gap_suppressed {
            warn!(chart = %self.id, slots = report.slots_written, "gap suppressed, wrote empty slots");
        }
        report
    }

    pub fn dim_ids(&self) -> Vec<String> {
        self.dim_order.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> Chart {
        Chart::new("net.eth0", "net", "eth0", "network", "net.net", "kilobits/s", 100, 1, 60).unwrap()
    }

    #[test]
    fn adding_same_dim_id_twice_returns_existing() {
        let c = chart();
        let a = c.add_dim("received", "received", Algorithm::Incremental, 8, 1000).unwrap();
        let b = c.add_dim("received", "ignored-on-second-add", Algorithm::Absolute, 1, 1).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(c.dim_ids(), vec!["received".to_string()]);
    }

    #[test]
    fn commits_advance_the_grid() {
        let c = chart();
        c.add_dim("received", "received", Algorithm::Absolute, 1, 1).unwrap();
        c.set("received", 10, 1_000_000).unwrap();
        let report = c.done(1_000_000, 0);
        assert_eq!(report.slots_written, 1);
        assert_eq!(c.grid.counter(), 1);
    }

    #[test]
    fn set_on_unknown_dimension_errors() {
        let c = chart();
        assert!(c.set("missing", 1, 0).is_err());
    }

    #[test]
    fn zero_divisor_is_rejected() {
        let c = chart();
        let err = c.add_dim("received", "received", Algorithm::Absolute, 1, 0).unwrap_err();
        assert!(matches!(err, RegistryError::ZeroDivisor));
    }

    #[test]
    fn unknown_algorithm_name_is_rejected() {
        let c = chart();
        let err = c
            .add_dim_named("received", "received", "not-a-real-algorithm", 1, 1)
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownAlgorithm(_)));
    }

    #[test]
    fn strict_add_dim_detects_duplicate() {
        let c = chart();
        c.add_dim("received", "received", Algorithm::Absolute, 1, 1).unwrap();
        let err = c
            .add_dim_strict("received", "received", Algorithm::Absolute, 1, 1)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDimension(..)));
    }

    #[test]
    fn out_of_range_entries_is_rejected_by_constructor() {
        let err = Chart::new("net.eth0", "net", "eth0", "network", "net.net", "kilobits/s", 100, 1, 0).unwrap_err();
        assert!(matches!(err, RegistryError::EntriesOutOfRange { .. }));
    }

    #[test]
    fn viewable_requires_enabled_not_obsolete_and_nonempty() {
        let c = chart();
        assert!(!c.viewable(), "no dimensions yet");
        c.add_dim("received", "received", Algorithm::Absolute, 1, 1).unwrap();
        assert!(c.viewable());
        c.disable();
        assert!(!c.viewable());
        c.enable();
        c.mark_obsolete();
        assert!(!c.viewable());
    }

    #[test]
    fn display_attributes_default_and_update() {
        let c = chart();
        assert_eq!(c.title(), c.name());
        assert_eq!(c.kind(), ChartKind::Line);
        assert_eq!(c.cache_dir(), None);

        c.set_title("Network Traffic on eth0");
        c.set_kind(ChartKind::Area);
        c.set_cache_dir("/var/cache/rrdb/net.eth0");

        assert_eq!(c.title(), "Network Traffic on eth0");
        assert_eq!(c.kind(), ChartKind::Area);
        assert_eq!(c.cache_dir(), Some("/var/cache/rrdb/net.eth0".to_string()));
    }

    #[test]
    fn detail_and_debug_flags_are_independent() {
        let c = chart();
        assert!(!c.is_detail());
        assert!(!c.is_debug());
        c.set_detail(true);
        assert!(c.is_detail());
        assert!(!c.is_debug());
        c.set_debug(true);
        assert!(c.is_debug());
    }
}
