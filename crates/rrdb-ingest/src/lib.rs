//! The ingestion engine: turns irregular collector samples into the regular
//! grid a [`rrdb_core::Ring`] stores (§4.3). This is where raw collected
//! values become calculated values, calculated values get interpolated
//! across however many grid slots a tick spans, and a chart's dimensions are
//! kept in lockstep with its shared [`rrdb_core::TimeGrid`].
//!
//! This crate knows nothing about hosts, the registry, or persistence. It
//! operates purely on borrowed [`rrdb_core`] types handed to it by the
//! registry's `Chart::done()`.

mod algorithm;
mod dimension;
mod engine;

pub use algorithm::{Algorithm, UnknownAlgorithm};
pub use dimension::{CounterWidth, Dimension};
pub use engine::{done, CommitReport, DimensionSlot};
