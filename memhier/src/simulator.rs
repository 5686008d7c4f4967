use std::time::{Duration, Instant};
use log::debug;
use serde::{Deserialize, Serialize};
use crate::cache::DirectMappedCache;
use crate::config::{CacheConfig, HierarchyConfig, MemoryConfig, MemoryKindConfig};
use crate::error::{Error, Result};
use crate::main_memory::{MainMemory, VolatileMemory};
use crate::memory::{levels, Memory};
use crate::trace::{parse_line, Access};

/// The simulator builds a hierarchy from a configuration, replays traces against it and collects
/// results.
///
/// It supports calling simulate multiple times, the hierarchy keeps its state between calls and the
/// time taken and the results are updated accordingly
pub struct Simulator {
    top: Box<dyn Memory>,
    result: SimulationResult,
    simulation_time: Duration,
}

/// The result of a simulation, ordered from the top level down to memory
#[derive(Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct SimulationResult {
    pub levels: Vec<LevelResult>,
    /// The word returned by the last read of the trace, if there was one
    pub last_read: Option<u64>,
}

/// The counters for an individual level. Hits, misses and bypasses are always zero for memory
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct LevelResult {
    pub name: String,
    pub reads: u64,
    pub writes: u64,
    pub hits: u64,
    pub misses: u64,
    pub bypasses: u64,
}

impl Simulator {

    /// Creates a new simulator for a given configuration
    ///
    /// # Arguments
    ///
    /// * `config`: A hierarchy configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<Simulator, Error>
    pub fn new(config: &HierarchyConfig) -> Result<Self> {
        // Build from the bottom up, the first configured cache ends up on top
        let top = config.caches
            .iter()
            .rev()
            .try_fold(Self::config_to_memory(&config.memory)?, Self::wrap_with_cache)?;
        let mut simulator = Self::from_memory(top);
        simulator.refresh_result();
        Ok(simulator)
    }

    /// Creates a simulator over an already built hierarchy
    pub fn from_memory(top: Box<dyn Memory>) -> Self {
        Self {
            top,
            result: SimulationResult::default(),
            simulation_time: Duration::new(0, 0),
        }
    }

    /// Performs a single access against the top of the hierarchy, returning the word for reads
    pub fn apply(&mut self, access: &Access) -> Result<Option<u64>> {
        match *access {
            Access::Read { address } => {
                let word = self.top.read(address)?;
                self.result.last_read = Some(word);
                Ok(Some(word))
            }
            Access::Write { address, word } => {
                self.top.write(word, address)?;
                Ok(None)
            }
        }
    }

    /// Simulates a whole trace, one access per line
    ///
    /// Stops at the first malformed line or failed access. Accesses before the failure have
    /// already been applied, and the result still reflects them
    ///
    /// # Arguments
    ///
    /// * `trace`: The trace text
    ///
    /// returns: Result<&SimulationResult, Error>
    pub fn simulate(&mut self, trace: &str) -> Result<&SimulationResult> {
        let start = Instant::now();
        let mut outcome = Ok(());
        for (i, line) in trace.lines().enumerate() {
            outcome = parse_line(line, i + 1).and_then(|access| match access {
                Some(access) => self.apply(&access).map(|_| ()),
                None => Ok(()),
            });
            if outcome.is_err() {
                break;
            }
        }
        self.simulation_time += start.elapsed();
        self.refresh_result();
        outcome.map(|_| &self.result)
    }

    /// The latest results
    pub fn result(&self) -> &SimulationResult {
        &self.result
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// The top of the hierarchy
    pub fn top(&self) -> &dyn Memory {
        &*self.top
    }

    fn refresh_result(&mut self) {
        self.result.levels = levels(&*self.top)
            .into_iter()
            .map(|level| {
                let stats = level.stats();
                LevelResult {
                    name: level.name().to_string(),
                    reads: stats.reads,
                    writes: stats.writes,
                    hits: stats.hits,
                    misses: stats.misses,
                    bypasses: stats.bypasses,
                }
            })
            .collect();
    }

    /// Creates the leaf store from a memory configuration
    fn config_to_memory(config: &MemoryConfig) -> Result<Box<dyn Memory>> {
        match config.kind {
            MemoryKindConfig::File => {
                let path = config.path
                    .as_ref()
                    .ok_or_else(|| Error::Config("file backed memory needs a path".to_string()))?;
                Ok(Box::new(MainMemory::open(path, config.size)?))
            }
            MemoryKindConfig::Volatile => Ok(Box::new(VolatileMemory::try_new(config.size)?)),
        }
    }

    /// Puts a new cache from a cache configuration on top of `lower`
    fn wrap_with_cache(lower: Box<dyn Memory>, config: &CacheConfig) -> Result<Box<dyn Memory>> {
        debug!("Adding cache {} on top of {}", config.name, lower.name());
        let cache = DirectMappedCache::new(lower, config.lines, config.block_size)?
            .with_name(config.name.clone());
        Ok(Box::new(cache))
    }
}
