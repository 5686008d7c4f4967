use serde::{Deserialize, Serialize};
use crate::error::Result;

/// Width of a word in bytes. Words are stored little-endian
pub const WORD_SIZE: u64 = 8;

/// A generic trait for addressable storage of 64-bit words
///
/// Stores, caches and anything else which behaves like memory implement this, so a cache can sit
/// on top of any conforming lower level, including another cache
///
/// There is no shared bounds checking, every implementation must enforce its own addressing rules
/// and report violations as `Error::AddressViolation`
pub trait Memory {

    /// Reads the word stored at an address
    ///
    /// Takes `&mut self` as reading through a cache may fill a line
    ///
    /// # Arguments
    ///
    /// * `address`: The byte address of the word
    ///
    /// returns: Result<u64, Error>
    fn read(&mut self, address: u64) -> Result<u64>;

    /// Stores a word at an address, with the same addressing rules as read
    ///
    /// # Arguments
    ///
    /// * `word`: The value to store
    /// * `address`: The byte address of the word
    ///
    /// returns: Result<(), Error>
    fn write(&mut self, word: u64, address: u64) -> Result<()>;

    /// A short name for this level, used when reporting results
    fn name(&self) -> &str {
        "memory"
    }

    /// Access counters for this level only
    fn stats(&self) -> AccessStats {
        AccessStats::default()
    }

    /// The level below this one, if any. Lets a driver walk a whole hierarchy from the top
    fn lower_level(&self) -> Option<&dyn Memory> {
        None
    }
}

/// Per level access counters. Failed accesses are still counted
///
/// For a cache every read and write lands in exactly one of hits, misses or bypasses, the latter
/// being sub-word accesses handed straight to the level below
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct AccessStats {
    pub reads: u64,
    pub writes: u64,
    pub hits: u64,
    pub misses: u64,
    pub bypasses: u64,
}

impl<M: Memory + ?Sized> Memory for &mut M {
    fn read(&mut self, address: u64) -> Result<u64> {
        (**self).read(address)
    }

    fn write(&mut self, word: u64, address: u64) -> Result<()> {
        (**self).write(word, address)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn stats(&self) -> AccessStats {
        (**self).stats()
    }

    fn lower_level(&self) -> Option<&dyn Memory> {
        (**self).lower_level()
    }
}

impl<M: Memory + ?Sized> Memory for Box<M> {
    fn read(&mut self, address: u64) -> Result<u64> {
        (**self).read(address)
    }

    fn write(&mut self, word: u64, address: u64) -> Result<()> {
        (**self).write(word, address)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn stats(&self) -> AccessStats {
        (**self).stats()
    }

    fn lower_level(&self) -> Option<&dyn Memory> {
        (**self).lower_level()
    }
}

/// Walks a hierarchy from the given level down to the leaf, collecting every level
pub fn levels(top: &dyn Memory) -> Vec<&dyn Memory> {
    let mut out = vec![top];
    let mut current = top;
    while let Some(lower) = current.lower_level() {
        out.push(lower);
        current = lower;
    }
    out
}
