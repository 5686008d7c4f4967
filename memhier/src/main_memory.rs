use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use log::{debug, info};
use crate::error::{Error, Result, ViolationKind};
use crate::memory::{AccessStats, Memory, WORD_SIZE};

/// Checks an address against the word addressing rules shared by the stores in this module,
/// returning the buffer offset of the word
///
/// Overflow safe, an address close to u64::MAX is out of bounds rather than wrapping around
fn word_offset(address: u64, capacity: u64) -> Result<usize> {
    if address % WORD_SIZE != 0 {
        return Err(Error::AddressViolation { address, reason: ViolationKind::Misaligned });
    }
    match address.checked_add(WORD_SIZE) {
        Some(end) if end <= capacity => Ok(address as usize),
        _ => Err(Error::AddressViolation { address, reason: ViolationKind::OutOfBounds }),
    }
}

/// Grows or shrinks `storage` to exactly `capacity` bytes, zero-filling new space. A capacity the
/// process can't allocate is reported rather than aborting
fn zeroed_to_capacity(mut storage: Vec<u8>, capacity: u64) -> Result<Vec<u8>> {
    let unallocatable = || Error::Config(format!("a memory of {capacity} bytes can't be allocated"));
    let length = usize::try_from(capacity).map_err(|_| unallocatable())?;
    if length > storage.len() {
        storage.try_reserve_exact(length - storage.len()).map_err(|_| unallocatable())?;
    }
    storage.resize(length, 0);
    Ok(storage)
}

fn load_word(buffer: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; WORD_SIZE as usize];
    bytes.copy_from_slice(&buffer[offset..offset + WORD_SIZE as usize]);
    u64::from_le_bytes(bytes)
}

fn store_word(buffer: &mut [u8], offset: usize, word: u64) {
    buffer[offset..offset + WORD_SIZE as usize].copy_from_slice(&word.to_le_bytes());
}

/// The lowest level of the hierarchy: a fixed size store persisted to a flat file
///
/// The file holds exactly `capacity` bytes, byte `i` of the file is byte `i` of the store, with no
/// header. Every write re-persists the whole buffer before returning
#[derive(Debug)]
pub struct MainMemory {
    path: PathBuf,
    storage: Vec<u8>,
    stats: AccessStats,
}

impl MainMemory {

    /// Opens a store backed by the file at `path`, creating it if it doesn't exist
    ///
    /// Existing content shorter than `capacity` is zero-padded, longer content is truncated. The
    /// normalised buffer is written back straight away so the file length always matches the
    /// capacity
    ///
    /// # Arguments
    ///
    /// * `path`: The backing file
    /// * `capacity`: The size of the store in bytes
    ///
    /// returns: Result<MainMemory, Error>
    pub fn open<P: AsRef<Path>>(path: P, capacity: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let storage = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No existing content at {}, starting from zero", path.display());
                Vec::new()
            }
            Err(source) => return Err(Error::Io { path, source }),
        };
        let persisted = storage.len() as u64;
        if persisted != capacity {
            info!(
                "Reconciling {} from {persisted} to {capacity} bytes",
                path.display()
            );
        }
        let storage = zeroed_to_capacity(storage, capacity)?;
        let memory = Self {
            path,
            storage,
            stats: AccessStats::default(),
        };
        memory.persist()?;
        info!("Opened main memory at {} ({capacity} bytes)", memory.path.display());
        Ok(memory)
    }

    /// Writes the whole buffer to the backing file. The file is closed on every path out of here,
    /// including errors
    fn persist(&self) -> Result<()> {
        let to_io_error = |source| Error::Io { path: self.path.clone(), source };
        let mut file: File = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(to_io_error)?;
        file.write_all(&self.storage).map_err(to_io_error)?;
        file.flush().map_err(to_io_error)?;
        file.sync_data().map_err(to_io_error)
    }

    pub fn capacity(&self) -> u64 {
        self.storage.len() as u64
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw contents of the store, identical to the persisted file
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage
    }
}

impl Memory for MainMemory {
    fn read(&mut self, address: u64) -> Result<u64> {
        self.stats.reads += 1;
        let offset = word_offset(address, self.capacity())?;
        Ok(load_word(&self.storage, offset))
    }

    fn write(&mut self, word: u64, address: u64) -> Result<()> {
        self.stats.writes += 1;
        let offset = word_offset(address, self.capacity())?;
        store_word(&mut self.storage, offset, word);
        self.persist()
    }

    fn name(&self) -> &str {
        "main memory"
    }

    fn stats(&self) -> AccessStats {
        self.stats
    }
}

/// An in-memory store with the same addressing rules as `MainMemory` but nothing persisted
///
/// Useful as a stand-in for main memory in tests, or as a scratch leaf for a simulation
#[derive(Debug, Clone)]
pub struct VolatileMemory {
    storage: Vec<u8>,
    stats: AccessStats,
}

impl VolatileMemory {
    /// A zeroed store. Panics like `vec!` if the capacity can't be allocated, use try_new for
    /// capacities coming from user input
    pub fn new(capacity: u64) -> Self {
        Self::from_bytes(vec![0; capacity as usize])
    }

    pub fn try_new(capacity: u64) -> Result<Self> {
        Ok(Self::from_bytes(zeroed_to_capacity(Vec::new(), capacity)?))
    }

    /// Uses `bytes` as the initial content, the capacity is its length
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            storage: bytes,
            stats: AccessStats::default(),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.storage.len() as u64
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.storage
    }
}

impl Memory for VolatileMemory {
    fn read(&mut self, address: u64) -> Result<u64> {
        self.stats.reads += 1;
        let offset = word_offset(address, self.capacity())?;
        Ok(load_word(&self.storage, offset))
    }

    fn write(&mut self, word: u64, address: u64) -> Result<()> {
        self.stats.writes += 1;
        let offset = word_offset(address, self.capacity())?;
        store_word(&mut self.storage, offset, word);
        Ok(())
    }

    fn name(&self) -> &str {
        "volatile memory"
    }

    fn stats(&self) -> AccessStats {
        self.stats
    }
}
