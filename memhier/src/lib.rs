//! # MemHier
//!
//! MemHier is a library for simulating a direct mapped cache in front of a persistent main memory
//!
//! It provides a `Memory` trait implemented by every level of a hierarchy, a file backed main
//! memory, and a write-through direct mapped cache which can be stacked on any `Memory`, including
//! another cache. A trace driven simulator runs configured hierarchies and reports hit and miss
//! counts per level

/// Contains the direct mapped cache and its line record
pub mod cache;

/// Contains definitions for the JSON hierarchy configuration
pub mod config;

/// Error and result types shared by every level
pub mod error;

/// Loading trace files
pub mod io;

/// Contains the file backed main memory and an in-memory stand-in
pub mod main_memory;

/// Contains the `Memory` trait implemented by every level of a hierarchy
pub mod memory;

/// Contains the simulator used to replay a trace against a configured hierarchy
pub mod simulator;

/// Contains the trace format
pub mod trace;


pub use cache::{AccessKind, CacheLine, DirectMappedCache};
pub use error::{Error, Result};
pub use main_memory::{MainMemory, VolatileMemory};
pub use memory::{AccessStats, Memory};
