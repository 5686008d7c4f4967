use serde::Deserialize;

/// A memory hierarchy: caches ordered from the client side down, on top of a single memory
#[derive(Debug, Deserialize)]
pub struct HierarchyConfig {
    pub memory: MemoryConfig,
    #[serde(default)]
    pub caches: Vec<CacheConfig>,
}

/// The leaf store of the hierarchy
#[derive(Debug, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub kind: MemoryKindConfig,
    /// Backing file, required for file backed memory
    pub path: Option<String>,
    /// Capacity in bytes
    pub size: u64,
}

/// The kind of memory - file or volatile. Defaults to file.
#[derive(Debug, Copy, Clone, Default, Deserialize, Eq, PartialEq)]
pub enum MemoryKindConfig {
    #[default]
    #[serde(alias = "file")]
    File,
    #[serde(alias = "volatile")]
    Volatile,
}

/// A configuration for a single direct mapped cache
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    pub name: String,
    /// Number of lines, a power of two
    pub lines: u64,
    /// Words per line, a power of two
    pub block_size: u64,
}
