//! The facade's top-level error type: every sub-crate error, plus the
//! facade's own persistence-path bookkeeping failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RrdbError {
    #[error(transparent)]
    Registry(#[from] rrdb_registry::RegistryError),

    #[error(transparent)]
    Persist(#[from] rrdb_persist::PersistError),

    #[error("memory mode {0:?} requires a data_dir in RrdConfig")]
    MissingDataDir(rrdb_persist::MemoryMode),

    #[error("io error preparing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
