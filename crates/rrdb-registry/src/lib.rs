//! The entity registry: host → chart → dimension, indexed for lookup by id
//! and by name, and the three-tier lock hierarchy that protects structural
//! changes (§4.4, §5).
//!
//! Lock order is always outer to inner: the registry's host map, then a
//! host's chart maps, then a chart's dimension map and commit lock. Nothing
//! in this crate ever acquires a host lock while already holding the
//! registry lock's write side for longer than the lookup itself, and nothing
//! holds a chart lock across an await point or a call back into the
//! registry — there are none to hold across, since everything here is
//! synchronous.

mod chart;
mod dimension;
mod error;
mod host;
mod naming;
mod registry;

pub use chart::{Chart, ChartKind};
pub use dimension::Dimension;
pub use error::RegistryError;
pub use host::{Host, HISTORY_ENTRIES_MAX, HISTORY_ENTRIES_MIN, UPDATE_EVERY_MAX, UPDATE_EVERY_MIN};
pub use naming::sanitize;
pub use registry::Registry;
