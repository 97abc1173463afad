//! On-disk header layouts for the `map`/`save` memory modes, and the
//! page-size alignment helper used to size a dimension's backing file.

use serde::{Deserialize, Serialize};

/// Magic string at the start of a dimension's backing file.
pub const DIMENSION_MAGIC: &str = "NETDATA RRD DIMENSION FILE V019";

/// Magic string at the start of a chart's metadata file.
pub const CHART_MAGIC: &str = "NETDATA RRD SET FILE V019";

/// Fixed-size header preceding a dimension's packed-value array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionFileHeader {
    pub magic: String,
    pub id: String,
    pub name: String,
    pub multiplier: i64,
    pub divisor: i64,
    pub update_every: u32,
    pub entries: usize,
    pub current_entry: usize,
    pub counter: u64,
    pub last_updated: i64,
    /// CRC32 of the header fields above plus the value array, computed on
    /// write and checked on load.
    pub checksum: u32,
}

impl DimensionFileHeader {
    #[must_use]
    pub fn new(
        id: String,
        name: String,
        multiplier: i64,
        divisor: i64,
        update_every: u32,
        entries: usize,
        current_entry: usize,
        counter: u64,
        last_updated: i64,
    ) -> Self {
        Self {
            magic: DIMENSION_MAGIC.to_string(),
            id,
            name,
            multiplier,
            divisor,
            update_every,
            entries,
            current_entry,
            counter,
            last_updated,
            checksum: 0,
        }
    }
}

/// Chart-level metadata persisted once per chart, alongside (not instead of)
/// each of its dimensions' own files (§4.5/§6: "one file per dimension plus
/// one chart metadata file").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartFileHeader {
    pub magic: String,
    pub id: String,
    pub type_: String,
    pub name: String,
    pub family: String,
    pub context: String,
    pub units: String,
    pub priority: i32,
    pub update_every: u32,
    pub entries: usize,
    /// CRC32 of these fields' bincode encoding; there's no trailing value
    /// array for a chart file, so this guards against a truncated write
    /// rather than against corrupted sample data.
    pub checksum: u32,
}

impl ChartFileHeader {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        type_: String,
        name: String,
        family: String,
        context: String,
        units: String,
        priority: i32,
        update_every: u32,
        entries: usize,
    ) -> Self {
        Self {
            magic: CHART_MAGIC.to_string(),
            id,
            type_,
            name,
            family,
            context,
            units,
            priority,
            update_every,
            entries,
            checksum: 0,
        }
    }
}

#[cfg(unix)]
fn page_size() -> usize {
    // SAFETY: sysconf with _SC_PAGESIZE reads a static system parameter and
    // never fails in a way that makes the returned value unsafe to use; a
    // negative return (error) only happens for unsupported `name` values.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

#[cfg(not(unix))]
fn page_size() -> usize {
    4096
}

/// Rounds `entries` up so that `header_size + entries * 4` bytes is an exact
/// multiple of the system page size, matching `align_entries_to_pagesize`'s
/// role in the original format: a dimension file always maps a whole number
/// of pages, so the kernel never has to zero-fill a partial last page.
#[must_use]
pub fn align_entries_to_pagesize(entries: usize, header_size: usize) -> usize {
    let page = page_size();
    let value_size = std::mem::size_of::<i32>();
    let total = header_size + entries * value_size;
    let aligned_total = total.div_ceil(page) * page;
    (aligned_total - header_size) / value_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_never_shrinks_requested_depth() {
        for entries in [1, 60, 600, 3600, 86400] {
            let aligned = align_entries_to_pagesize(entries, 256);
            assert!(aligned >= entries);
        }
    }

    #[test]
    fn alignment_is_idempotent() {
        let once = align_entries_to_pagesize(1000, 256);
        let twice = align_entries_to_pagesize(once, 256);
        assert_eq!(once, twice);
    }
}
