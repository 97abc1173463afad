//! rrdb - Hierarchical Round-Robin Time-Series Storage Core
//!
//! A real-time metrics collector's storage engine: a lock-free, fixed-depth
//! ring per dimension, a shared time grid per chart, and a three-tier
//! locking discipline across the host → chart → dimension hierarchy (§3-§5).
//!
//! This crate is the facade: it wires together `rrdb-core` (the storage
//! number codec and the ring/time-grid arithmetic), `rrdb-ingest` (the
//! collection algorithms and the interpolating `done()` commit), `rrdb-registry`
//! (the host/chart/dimension entity hierarchy) and `rrdb-persist` (the four
//! memory modes), and exposes the collector-facing API a real agent would
//! call once per tick.
//!
//! # Example
//!
//! ```
//! use rrdb::{Rrdb, RrdConfig};
//! use rrdb::Algorithm;
//!
//! let rrdb = Rrdb::new(RrdConfig::default());
//! let host = rrdb.find_or_create_host("web01", "11111111-2222-3333-4444-555555555555");
//! let chart = rrdb
//!     .create_chart(&host, "eth0", "net", "eth0", "network", "net.net", "kilobits/s", 100, None, None)
//!     .unwrap();
//! chart.add_dim("received", "received", Algorithm::Incremental, 8, 1000).unwrap();
//!
//! chart.set("received", 1_000_000, 0).unwrap();
//! rrdb.done(&chart, 0);
//! ```

mod config;
mod error;
mod persist;

pub use config::RrdConfig;
pub use error::RrdbError;

pub use rrdb_core::{Ring, StorageFlags, StorageNumber, TimeGrid};
pub use rrdb_ingest::{Algorithm, CommitReport, CounterWidth};
pub use rrdb_persist::MemoryMode;
pub use rrdb_registry::{Chart, Dimension, Host, Registry, RegistryError};

use std::sync::Arc;
use tracing::debug;

/// The top-level handle: one registry of hosts/charts/dimensions, plus the
/// configuration governing defaults and persistence for anything created
/// through it.
pub struct Rrdb {
    pub config: RrdConfig,
    registry: Registry,
}

impl Rrdb {
    #[must_use]
    pub fn new(config: RrdConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn find_or_create_host(&self, hostname: &str, machine_guid: &str) -> Arc<Host> {
        self.registry.find_or_create_host(hostname, machine_guid)
    }

    /// Looks up a registered host, failing rather than returning `None` if
    /// it isn't there.
    pub fn host(&self, machine_guid: &str) -> Result<Arc<Host>, RrdbError> {
        Ok(self.registry.get_host(machine_guid)?)
    }

    /// Frees `machine_guid`'s host if it's been `ORPHAN` for at least
    /// [`RrdConfig::rrdhost_free_orphan_time`] as of `now_usec` (§4.4).
    /// Returns whether it was freed.
    #[must_use]
    pub fn cleanup_orphan(&self, machine_guid: &str, now_usec: i64) -> bool {
        let grace_usec = i64::from(self.config.rrdhost_free_orphan_time) * 1_000_000;
        self.registry.cleanup_orphan(machine_guid, now_usec, grace_usec)
    }

    /// Finds or creates a chart under `host`, then (for a persistent memory
    /// mode) attempts to hydrate its dimensions' rings from disk. A missing
    /// or unusable backing file is not an error: the chart is simply born
    /// empty, same as if it had just been created for the first time.
    ///
    /// `update_every`/`entries` default to [`RrdConfig::default_update_every`]
    /// and [`RrdConfig::default_history_entries`] when `None`.
    #[allow(clippy::too_many_arguments)]
    pub fn create_chart(
        &self,
        host: &Host,
        id: &str,
        type_: &str,
        name: &str,
        family: &str,
        context: &str,
        units: &str,
        priority: i32,
        update_every: Option<u32>,
        entries: Option<usize>,
    ) -> Result<Arc<Chart>, RrdbError> {
        let update_every = update_every.unwrap_or(self.config.default_update_every);
        let entries = entries.unwrap_or(self.config.default_history_entries);
        let chart = host.create_chart(id, type_, name, family, context, units, priority, update_every, entries)?;
        Ok(chart)
    }

    /// Adds a dimension to `chart` and, for a persistent memory mode, tries
    /// to hydrate its ring from a matching backing file (same reconciliation
    /// policy as [`Rrdb::create_chart`]).
    pub fn add_dim(
        &self,
        host: &Host,
        chart: &Chart,
        raw_id: &str,
        raw_name: &str,
        algorithm: Algorithm,
        multiplier: i64,
        divisor: i64,
    ) -> Result<Arc<Dimension>, RrdbError> {
        let dim = chart.add_dim(raw_id, raw_name, algorithm, multiplier, divisor)?;
        persist::load_chart(&self.config, host, chart);
        debug!(chart = %chart.id, dim = %dim.id, "dimension added");
        Ok(dim)
    }

    /// Commits the current tick for `chart` (§4.3).
    pub fn done(&self, chart: &Chart, now_usec: i64) -> CommitReport {
        chart.done(now_usec, self.config.gap_when_lost_iterations_above)
    }

    /// Snapshots every dimension of `chart` to its backing file. A no-op
    /// for `None`/`Ram` memory modes.
    pub fn save_chart(&self, host: &Host, chart: &Chart) -> Result<(), RrdbError> {
        persist::save_chart(&self.config, host, chart)
    }
}
