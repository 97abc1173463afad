//! Ambient configuration for an [`crate::Rrdb`] instance.

use rrdb_persist::MemoryMode;
use std::path::PathBuf;

/// Settings shared by every host/chart a given [`crate::Rrdb`] manages.
/// Individual charts may still be created with their own cadence and ring
/// depth; these are only the defaults and the persistence policy.
#[derive(Debug, Clone)]
pub struct RrdConfig {
    /// Cadence new charts get when a collector doesn't specify one.
    /// Default: 1 second.
    pub default_update_every: u32,
    /// Ring depth new charts get when a collector doesn't specify one.
    /// Default: 3600 slots (one hour at 1-second cadence).
    pub default_history_entries: usize,
    /// How charts are persisted. Default: [`MemoryMode::Ram`].
    pub memory_mode: MemoryMode,
    /// A tick whose ring-slot span exceeds this many iterations gets its
    /// interpolated (non-final) slots written as gaps instead of a straight
    /// line. `0` disables gap suppression entirely. Default: 60.
    pub gap_when_lost_iterations_above: u32,
    /// Root directory backing files live under, for `Map`/`Save` memory
    /// modes. Required (and validated at startup) whenever `memory_mode`
    /// is persistent; ignored for `None`/`Ram`.
    pub data_dir: Option<PathBuf>,
    /// How long (seconds) a host may sit with its `ORPHAN` flag set before
    /// [`crate::Rrdb::cleanup_orphan`] frees it (§4.4). Default: 3600.
    pub rrdhost_free_orphan_time: u32,
}

impl Default for RrdConfig {
    fn default() -> Self {
        Self {
            default_update_every: 1,
            default_history_entries: 3600,
            memory_mode: MemoryMode::Ram,
            gap_when_lost_iterations_above: 60,
            data_dir: None,
            rrdhost_free_orphan_time: 3600,
        }
    }
}

impl RrdConfig {
    #[must_use]
    pub fn with_memory_mode(mut self, mode: MemoryMode) -> Self {
        self.memory_mode = mode;
        self
    }

    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_default_update_every(mut self, update_every: u32) -> Self {
        self.default_update_every = update_every;
        self
    }

    #[must_use]
    pub fn with_default_history_entries(mut self, entries: usize) -> Self {
        self.default_history_entries = entries;
        self
    }

    #[must_use]
    pub fn with_gap_when_lost_iterations_above(mut self, iterations: u32) -> Self {
        self.gap_when_lost_iterations_above = iterations;
        self
    }

    #[must_use]
    pub fn with_rrdhost_free_orphan_time(mut self, seconds: u32) -> Self {
        self.rrdhost_free_orphan_time = seconds;
        self
    }
}
