/// Initial size of the mmap region backing a freshly opened environment.
/// The caller's policy grows this by closing and reopening with a larger
/// value when the KV engine reports the map as full.
pub const DEFAULT_MAP_SIZE: usize = 100 * 1024 * 1024;

/// Configuration accepted by [`crate::PageDb::open`].
#[derive(Debug, Clone, Copy)]
pub struct PageDbConfig {
    /// Initial size of the mmap region, in bytes.
    pub initial_map_size: usize,
    /// Create the database directory (and sub-databases) if missing.
    pub create_if_missing: bool,
    /// Open the environment read-only; `add` and the ranking writebacks
    /// will fail against a read-only handle.
    pub read_only: bool,
}

impl Default for PageDbConfig {
    fn default() -> Self {
        PageDbConfig {
            initial_map_size: DEFAULT_MAP_SIZE,
            create_if_missing: true,
            read_only: false,
        }
    }
}
