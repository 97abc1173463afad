//! The four memory modes a chart or dimension can be persisted under (§4.5).

/// How a dimension's ring is backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryMode {
    /// No backing file at all; the ring lives only in process memory and is
    /// lost across restarts.
    #[default]
    None,
    /// Same as `None`, but named distinctly because collectors may query it
    /// to decide whether requesting a save is pointless.
    Ram,
    /// Backed by a memory-mapped file (`mmap`); writes are visible to the
    /// file immediately, durable only as far as the kernel's page cache
    /// until an explicit or periodic `msync`.
    Map,
    /// Backed by a plain file, snapshotted on an explicit `save()` call
    /// rather than continuously mapped.
    Save,
}

impl MemoryMode {
    #[must_use]
    pub fn is_persistent(self) -> bool {
        matches!(self, Self::Map | Self::Save)
    }
}
