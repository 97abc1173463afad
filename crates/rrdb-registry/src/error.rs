//! Errors raised by the entity registry.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("host {0:?} not found")]
    HostNotFound(String),

    #[error("chart {0:?} not found")]
    ChartNotFound(String),

    #[error("dimension {0:?} not found on chart {1:?}")]
    DimensionNotFound(String, String),

    /// A chart with this id already exists with a different `update_every`
    /// or ring depth. rrdb rejects the recreation rather than silently
    /// reallocating the ring underneath any reader currently iterating it (§9).
    #[error("chart {id:?} already exists with update_every={existing_update_every} entries={existing_entries}, refusing to redefine as update_every={requested_update_every} entries={requested_entries}")]
    ChartRedefinitionConflict {
        id: String,
        existing_update_every: u32,
        existing_entries: usize,
        requested_update_every: u32,
        requested_entries: usize,
    },

    #[error("cadence must be in [{min}, {max}] seconds, got {got}")]
    UpdateEveryOutOfRange { got: u32, min: u32, max: u32 },

    #[error("ring depth must be in [{min}, {max}] slots, got {got}")]
    EntriesOutOfRange { got: usize, min: usize, max: usize },

    /// Raised by a chart's "strict" create path, for callers that want
    /// collision detection instead of the default find-or-create behavior.
    #[error("chart {0:?} already exists")]
    DuplicateChart(String),

    /// Same as [`RegistryError::DuplicateChart`], for dimensions.
    #[error("dimension {0:?} already exists on chart {1:?}")]
    DuplicateDimension(String, String),

    #[error("divisor must be non-zero")]
    ZeroDivisor,

    #[error(transparent)]
    UnknownAlgorithm(#[from] rrdb_ingest::UnknownAlgorithm),
}
