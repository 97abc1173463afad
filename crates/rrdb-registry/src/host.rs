//! A host: the charts and families belonging to one collected system (§3).

use crate::chart::Chart;
use crate::error::RegistryError;
use crate::naming::{disambiguate, sanitize};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Bounds from §6: cadence and ring depth collectors may request.
pub const UPDATE_EVERY_MIN: u32 = rrdb_core::UPDATE_EVERY_MIN;
pub const UPDATE_EVERY_MAX: u32 = rrdb_core::UPDATE_EVERY_MAX;
pub const HISTORY_ENTRIES_MIN: usize = rrdb_core::HISTORY_ENTRIES_MIN;
pub const HISTORY_ENTRIES_MAX: usize = rrdb_core::HISTORY_ENTRIES_MAX;

/// A single collected system: a `hostname`/`machine_guid` pair owning a set
/// of charts, indexed by id and by display name, grouped into families.
pub struct Host {
    pub hostname: String,
    pub machine_guid: String,
    /// OS label reported by the collector (e.g. `"linux"`). Informational;
    /// nothing in this crate branches on it.
    pub os: String,
    charts_by_id: RwLock<HashMap<String, Arc<Chart>>>,
    charts_by_name: RwLock<HashMap<String, Arc<Chart>>>,
    families: RwLock<HashMap<String, Vec<String>>>,
    variables: RwLock<HashMap<String, f64>>,
    /// Cadence/depth new charts get on this host absent an explicit
    /// override. `Rrdb` holds the process-wide defaults; these let a host
    /// carry its own (e.g. a streaming-received host inherits its sender's
    /// values instead of the local process defaults).
    default_update_every: AtomicI64,
    default_history_entries: AtomicI64,
    health_enabled: AtomicBool,
    streaming_destination: RwLock<Option<String>>,
    /// Raw bytes staged from a streaming sender, drained by the receive
    /// loop. Plain `Vec<u8>` behind the same lock tier as `families`: no
    /// code outside the host ever needs a handle into the middle of it.
    receive_buffer: RwLock<Vec<u8>>,
    /// ORPHAN flag (§4.4): set when a streaming sender disconnects. Cleared
    /// if the sender reconnects before [`Registry::cleanup_orphan`]'s grace
    /// period elapses.
    orphan: AtomicBool,
    /// Instant (µs) the sender disconnected, valid only while `orphan` is set.
    senders_disconnected_time_usec: AtomicI64,
}

impl Host {
    #[must_use]
    pub fn new(hostname: impl Into<String>, machine_guid: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            machine_guid: machine_guid.into(),
            os: "linux".to_string(),
            charts_by_id: RwLock::new(HashMap::new()),
            charts_by_name: RwLock::new(HashMap::new()),
            families: RwLock::new(HashMap::new()),
            variables: RwLock::new(HashMap::new()),
            default_update_every: AtomicI64::new(i64::from(UPDATE_EVERY_MIN)),
            default_history_entries: AtomicI64::new(HISTORY_ENTRIES_MIN as i64),
            health_enabled: AtomicBool::new(true),
            streaming_destination: RwLock::new(None),
            receive_buffer: RwLock::new(Vec::new()),
            orphan: AtomicBool::new(false),
            senders_disconnected_time_usec: AtomicI64::new(0),
        }
    }

    #[must_use]
    pub fn default_update_every(&self) -> u32 {
        self.default_update_every.load(Ordering::Acquire) as u32
    }

    pub fn set_default_update_every(&self, update_every: u32) {
        self.default_update_every.store(i64::from(update_every), Ordering::Release);
    }

    #[must_use]
    pub fn default_history_entries(&self) -> usize {
        self.default_history_entries.load(Ordering::Acquire) as usize
    }

    pub fn set_default_history_entries(&self, entries: usize) {
        self.default_history_entries.store(entries as i64, Ordering::Release);
    }

    #[must_use]
    pub fn is_health_enabled(&self) -> bool {
        self.health_enabled.load(Ordering::Acquire)
    }

    pub fn set_health_enabled(&self, enabled: bool) {
        self.health_enabled.store(enabled, Ordering::Release);
    }

    #[must_use]
    pub fn streaming_destination(&self) -> Option<String> {
        self.streaming_destination.read().clone()
    }

    pub fn set_streaming_destination(&self, destination: Option<String>) {
        *self.streaming_destination.write() = destination;
    }

    /// Appends freshly-received streamed bytes for the receive loop to
    /// drain later.
    pub fn push_received_bytes(&self, bytes: &[u8]) {
        self.receive_buffer.write().extend_from_slice(bytes);
    }

    /// Drains and returns everything staged by [`Host::push_received_bytes`].
    pub fn drain_received_bytes(&self) -> Vec<u8> {
        std::mem::take(&mut self.receive_buffer.write())
    }

    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<f64> {
        self.variables.read().get(name).copied()
    }

    pub fn set_variable(&self, name: impl Into<String>, value: f64) {
        self.variables.write().insert(name.into(), value);
    }

    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.orphan.load(Ordering::Acquire)
    }

    /// Marks the host orphaned as of `now_usec`, the instant its streaming
    /// sender disconnected.
    pub fn mark_orphan(&self, now_usec: i64) {
        self.orphan.store(true, Ordering::Release);
        self.senders_disconnected_time_usec.store(now_usec, Ordering::Release);
        info!(host = %self.hostname, "host marked orphan");
    }

    /// Clears the `ORPHAN` flag, e.g. on sender reconnection.
    pub fn clear_orphan(&self) {
        self.orphan.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn senders_disconnected_time_usec(&self) -> i64 {
        self.senders_disconnected_time_usec.load(Ordering::Acquire)
    }

    /// Finds or creates a chart. If a chart with this `type.id` already
    /// exists, it's returned unchanged when `update_every`/`entries` match;
    /// a mismatch is rejected rather than silently reallocating the ring
    /// underneath any reader currently iterating it (§9).
    #[allow(clippy::too_many_arguments)]
    pub fn create_chart(
        &self,
        id: &str,
        type_: &str,
        name: &str,
        family: &str,
        context: &str,
        units: &str,
        priority: i32,
        update_every: u32,
        entries: usize,
    ) -> Result<Arc<Chart>, RegistryError> {
        let full_id = sanitize(&format!("{type_}.{id}"));

        if let Some(existing) = self.charts_by_id.read().get(&full_id) {
            if existing.grid.update_every() == update_every && existing.grid.entries() == entries {
                return Ok(Arc::clone(existing));
            }
            warn!(chart = %full_id, "refusing to redefine chart with different cadence or depth");
            return Err(RegistryError::ChartRedefinitionConflict {
                id: full_id,
                existing_update_every: existing.grid.update_every(),
                existing_entries: existing.grid.entries(),
                requested_update_every: update_every,
                requested_entries: entries,
            });
        }

        let mut by_id = self.charts_by_id.write();
        if let Some(existing) = by_id.get(&full_id) {
            return Ok(Arc::clone(existing));
        }

        let mut by_name = self.charts_by_name.write();
        let display_name = disambiguate(&sanitize(name), |candidate| by_name.contains_key(candidate));

        let chart = Arc::new(Chart::new(
            full_id.clone(),
            type_,
            display_name.clone(),
            family,
            context,
            units,
            priority,
            update_every,
            entries,
        )?);
        by_id.insert(full_id.clone(), Arc::clone(&chart));
        by_name.insert(display_name, Arc::clone(&chart));
        self.families
            .write()
            .entry(sanitize(family))
            .or_default()
            .push(full_id);
        info!(host = %self.hostname, chart = %chart.id, "chart created");
        Ok(chart)
    }

    /// Like [`Host::create_chart`], but a chart already present under this
    /// `type.id` is reported as [`RegistryError::DuplicateChart`] instead of
    /// being returned unchanged. For callers who need to detect recreation
    /// rather than idempotently no-op on it.
    #[allow(clippy::too_many_arguments)]
    pub fn create_chart_strict(
        &self,
        id: &str,
        type_: &str,
        name: &str,
        family: &str,
        context: &str,
        units: &str,
        priority: i32,
        update_every: u32,
        entries: usize,
    ) -> Result<Arc<Chart>, RegistryError> {
        let full_id = sanitize(&format!("{type_}.{id}"));
        if self.charts_by_id.read().contains_key(&full_id) {
            return Err(RegistryError::DuplicateChart(full_id));
        }
        self.create_chart(id, type_, name, family, context, units, priority, update_every, entries)
    }

    #[must_use]
    pub fn find_chart_by_id(&self, id: &str) -> Option<Arc<Chart>> {
        self.charts_by_id.read().get(id).cloned()
    }

    #[must_use]
    pub fn find_chart_by_name(&self, name: &str) -> Option<Arc<Chart>> {
        self.charts_by_name.read().get(name).cloned()
    }

    pub fn rename_chart(&self, id: &str, new_name: &str) -> Result<(), RegistryError> {
        let chart = self
            .find_chart_by_id(id)
            .ok_or_else(|| RegistryError::ChartNotFound(id.to_string()))?;
        let mut by_name = self.charts_by_name.write();
        by_name.remove(&chart.name());
        let display_name = disambiguate(&sanitize(new_name), |candidate| by_name.contains_key(candidate));
        chart.rename(display_name.clone());
        by_name.insert(display_name, chart);
        Ok(())
    }

    #[must_use]
    pub fn family_charts(&self, family: &str) -> Vec<String> {
        self.families.read().get(family).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn chart_ids(&self) -> Vec<String> {
        self.charts_by_id.read().keys().cloned().collect()
    }

    /// Removes every chart marked obsolete. Families that end up empty are
    /// dropped too. Returns how many charts were reaped.
    pub fn cleanup_obsolete(&self) -> usize {
        let mut by_id = self.charts_by_id.write();
        let obsolete_ids: Vec<String> = by_id
            .values()
            .filter(|c| c.is_obsolete())
            .map(|c| c.id.clone())
            .collect();
        if obsolete_ids.is_empty() {
            return 0;
        }

        let mut by_name = self.charts_by_name.write();
        for id in &obsolete_ids {
            if let Some(chart) = by_id.remove(id) {
                by_name.remove(&chart.name());
            }
        }
        drop(by_name);
        drop(by_id);

        let mut families = self.families.write();
        for charts in families.values_mut() {
            charts.retain(|id| !obsolete_ids.contains(id));
        }
        families.retain(|_, charts| !charts.is_empty());
        info!(host = %self.hostname, count = obsolete_ids.len(), "obsolete charts reaped");
        obsolete_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_create_returns_existing_chart() {
        let h = Host::new("web01", "guid-1");
        let a = h
            .create_chart("eth0", "net", "eth0", "network", "net.net", "kilobits/s", 100, 1, 60)
            .unwrap();
        let b = h
            .create_chart("eth0", "net", "eth0", "network", "net.net", "kilobits/s", 100, 1, 60)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn redefinition_with_different_depth_is_rejected() {
        let h = Host::new("web01", "guid-1");
        h.create_chart("eth0", "net", "eth0", "network", "net.net", "kilobits/s", 100, 1, 60)
            .unwrap();
        let err = h
            .create_chart("eth0", "net", "eth0", "network", "net.net", "kilobits/s", 100, 1, 120)
            .unwrap_err();
        assert!(matches!(err, RegistryError::ChartRedefinitionConflict { .. }));
    }

    #[test]
    fn out_of_range_cadence_is_rejected() {
        let h = Host::new("web01", "guid-1");
        let err = h
            .create_chart("eth0", "net", "eth0", "network", "net.net", "kilobits/s", 100, 0, 60)
            .unwrap_err();
        assert!(matches!(err, RegistryError::UpdateEveryOutOfRange { .. }));
    }

    #[test]
    fn cleanup_obsolete_removes_only_marked_charts() {
        let h = Host::new("web01", "guid-1");
        let keep = h
            .create_chart("eth0", "net", "eth0", "network", "net.net", "kilobits/s", 100, 1, 60)
            .unwrap();
        let gone = h
            .create_chart("eth1", "net", "eth1", "network", "net.net", "kilobits/s", 100, 1, 60)
            .unwrap();
        gone.mark_obsolete();
        assert_eq!(h.cleanup_obsolete(), 1);
        assert!(h.find_chart_by_id(&keep.id).is_some());
        assert!(h.find_chart_by_id(&gone.id).is_none());
    }

    #[test]
    fn per_host_defaults_override_independently() {
        let h = Host::new("web01", "guid-1");
        assert_eq!(h.default_update_every(), UPDATE_EVERY_MIN);
        h.set_default_update_every(5);
        h.set_default_history_entries(120);
        assert_eq!(h.default_update_every(), 5);
        assert_eq!(h.default_history_entries(), 120);
    }

    #[test]
    fn orphan_flag_round_trips() {
        let h = Host::new("web01", "guid-1");
        assert!(!h.is_orphan());
        h.mark_orphan(42);
        assert!(h.is_orphan());
        assert_eq!(h.senders_disconnected_time_usec(), 42);
        h.clear_orphan();
        assert!(!h.is_orphan());
    }

    #[test]
    fn variables_index_is_per_host() {
        let h = Host::new("web01", "guid-1");
        assert_eq!(h.get_variable("load1"), None);
        h.set_variable("load1", 0.5);
        assert_eq!(h.get_variable("load1"), Some(0.5));
    }
}
