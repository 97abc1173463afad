//! Wires the registry's host/chart/dimension types to the persistence
//! backends (§4.5), choosing a file layout (`data_dir/machine_guid/chart_id/
//! dim_id.db`) and handling the reconciliation policy: a persisted file
//! whose geometry disagrees with the chart's current cadence/depth is
//! discarded and the dimension starts fresh rather than trying to migrate
//! it, and any I/O failure degrades to running in-memory only rather than
//! failing chart creation.

use crate::config::RrdConfig;
use crate::error::RrdbError;
use rrdb_persist::{self, ChartFileHeader, DimensionFileHeader, MappedDimension, MemoryMode};
use rrdb_registry::{Chart, Host};
use std::path::{Path, PathBuf};
use tracing::warn;

fn chart_dir(data_dir: &Path, host: &Host, chart: &Chart) -> PathBuf {
    data_dir.join(&host.machine_guid).join(&chart.id)
}

fn dim_path(dir: &Path, dim_id: &str) -> PathBuf {
    dir.join(format!("{dim_id}.db"))
}

fn chart_meta_path(dir: &Path) -> PathBuf {
    dir.join("chart.meta")
}

fn chart_header_for(chart: &Chart) -> ChartFileHeader {
    ChartFileHeader::new(
        chart.id.clone(),
        chart.type_.clone(),
        chart.name(),
        chart.family(),
        chart.context.clone(),
        chart.units.clone(),
        chart.priority,
        chart.grid.update_every(),
        chart.grid.entries(),
    )
}

fn header_for(chart: &Chart, dim: &rrdb_registry::Dimension) -> DimensionFileHeader {
    DimensionFileHeader::new(
        dim.id.clone(),
        dim.name(),
        dim.multiplier(),
        dim.divisor(),
        chart.grid.update_every(),
        chart.grid.entries(),
        chart.grid.current_entry(),
        chart.grid.counter(),
        chart.grid.last_entry_t(),
    )
}

pub(crate) fn save_chart(config: &RrdConfig, host: &Host, chart: &Chart) -> Result<(), RrdbError> {
    if !config.memory_mode.is_persistent() {
        return Ok(());
    }
    let data_dir = config
        .data_dir
        .as_ref()
        .ok_or(RrdbError::MissingDataDir(config.memory_mode))?;
    let dir = chart_dir(data_dir, host, chart);
    std::fs::create_dir_all(&dir).map_err(|e| RrdbError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    rrdb_persist::save_chart_header(&chart_meta_path(&dir), chart_header_for(chart))?;

    for dim_id in chart.dim_ids() {
        let Some(dim) = chart.find_dim(&dim_id) else {
            continue;
        };
        let header = header_for(chart, &dim);
        let values = dim.ring().snapshot_raw();
        let path = dim_path(&dir, &dim_id);

        match config.memory_mode {
            MemoryMode::Save => rrdb_persist::save_dimension(&path, header, &values)?,
            MemoryMode::Map => match MappedDimension::create(&path, header.clone()) {
                Ok(mut mapped) => mapped.sync(&path, header, &values)?,
                Err(e) => {
                    warn!(chart = %chart.id, dim = %dim_id, error = %e, "map mode unavailable, chart stays in-memory only");
                }
            },
            MemoryMode::None | MemoryMode::Ram => unreachable!("guarded by is_persistent above"),
        }
    }
    Ok(())
}

pub(crate) fn load_chart(config: &RrdConfig, host: &Host, chart: &Chart) {
    if !config.memory_mode.is_persistent() {
        return;
    }
    let Some(data_dir) = config.data_dir.as_ref() else {
        return;
    };
    let dir = chart_dir(data_dir, host, chart);

    let meta_path = chart_meta_path(&dir);
    if meta_path.exists() {
        match rrdb_persist::load_chart_header(&meta_path) {
            Ok(header) => {
                if header.update_every != chart.grid.update_every() || header.entries != chart.grid.entries() {
                    warn!(
                        chart = %chart.id,
                        file_update_every = header.update_every, file_entries = header.entries,
                        "persisted chart metadata disagrees with chart geometry"
                    );
                }
            }
            Err(e) => {
                warn!(chart = %chart.id, error = %e, "failed to load persisted chart metadata");
            }
        }
    }

    for dim_id in chart.dim_ids() {
        let Some(dim) = chart.find_dim(&dim_id) else {
            continue;
        };
        let path = dim_path(&dir, &dim_id);
        if !path.exists() {
            continue;
        }

        let loaded = match config.memory_mode {
            MemoryMode::Save => rrdb_persist::load_dimension(&path).map(|(h, v)| (h, v)),
            MemoryMode::Map => MappedDimension::open(&path).map(|(_, h, v)| (h, v)),
            MemoryMode::None | MemoryMode::Ram => continue,
        };

        match loaded {
            Ok((header, values)) => {
                if header.update_every != chart.grid.update_every() || header.entries != chart.grid.entries() {
                    warn!(
                        chart = %chart.id, dim = %dim_id,
                        file_update_every = header.update_every, file_entries = header.entries,
                        "persisted geometry disagrees with chart, discarding and starting fresh"
                    );
                    continue;
                }
                dim.restore_ring(&values);
                chart.grid.restore(header.current_entry, header.counter, header.last_updated);
            }
            Err(e) => {
                warn!(chart = %chart.id, dim = %dim_id, error = %e, "failed to load persisted dimension, starting fresh");
            }
        }
    }
}
