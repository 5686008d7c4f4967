use log::{debug, trace, warn};
use crate::error::{Error, Result};
use crate::memory::{AccessStats, Memory, WORD_SIZE};

const WORD_BITS: u32 = WORD_SIZE.trailing_zeros();

/// A single line of a direct mapped cache
///
/// Only the metadata the write-through algorithm needs is tracked. Type, dirty and lock bits are
/// reserved for a future write-back policy and deliberately absent
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CacheLine {
    valid: bool,
    tag: Option<u64>,
    blocks: Vec<u64>,
}

impl CacheLine {
    /// True when the tag and blocks mirror the lower level
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The tag of the block currently held, None when the line is invalid
    pub fn tag(&self) -> Option<u64> {
        self.tag
    }

    /// The words of the block currently held. Empty when the line is invalid
    pub fn blocks(&self) -> &[u64] {
        &self.blocks
    }

    fn holds(&self, tag: u64) -> bool {
        self.valid && self.tag == Some(tag)
    }

    /// Returns the line to its cold state
    pub fn invalidate(&mut self) {
        self.valid = false;
        self.tag = None;
        self.blocks.clear();
    }
}

/// The fields of an address as seen by a particular cache geometry
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AddressParts {
    pub tag: u64,
    /// Which line the address maps to
    pub index: usize,
    /// Word position within the block
    pub offset: usize,
}

/// Hit/miss classification of an access
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AccessKind {
    Hit,
    Miss,
}

/// A direct mapped, write-through, write-allocate cache in front of any `Memory`
///
/// Addresses are byte addresses. The offset field covers the bytes of a block, so with 8 byte
/// words it is `log2(block_size) + 3` bits wide, and the word position within a block is the byte
/// offset shifted down by 3. The cache never checks bounds itself: the level below is authoritative
/// and its errors are passed through untouched
///
/// The lower level can be owned, or borrowed by passing `&mut M`
pub struct DirectMappedCache<M: Memory> {
    lower: M,
    name: String,
    lines: Vec<CacheLine>,
    block_size: u64,
    offset_bits: u32,
    index_bits: u32,
    block_alignment_bit_mask: u64,
    index_bit_mask: u64,
    stats: AccessStats,
}

impl<M: Memory> DirectMappedCache<M> {

    /// Creates a cold cache in front of `lower`
    ///
    /// # Arguments
    ///
    /// * `lower`: The level this cache sits on
    /// * `num_lines`: The number of lines, a power of two
    /// * `block_size`: The number of words per line, a power of two
    ///
    /// returns: Result<DirectMappedCache<M>, Error>
    pub fn new(lower: M, num_lines: u64, block_size: u64) -> Result<Self> {
        if !num_lines.is_power_of_two() {
            return Err(Error::InvalidGeometry(format!("line count {num_lines} is not a power of two")));
        }
        if !block_size.is_power_of_two() {
            return Err(Error::InvalidGeometry(format!("block size {block_size} is not a power of two")));
        }
        let offset_bits = block_size.trailing_zeros() + WORD_BITS;
        let index_bits = num_lines.trailing_zeros();
        if offset_bits + index_bits > u64::BITS {
            return Err(Error::InvalidGeometry(format!(
                "{num_lines} lines of {block_size} words don't fit a 64-bit address"
            )));
        }
        let mut lines = Vec::new();
        usize::try_from(num_lines)
            .ok()
            .and_then(|n| lines.try_reserve_exact(n).ok())
            .ok_or_else(|| Error::InvalidGeometry(format!("{num_lines} lines can't be allocated")))?;
        lines.resize(num_lines as usize, CacheLine::default());
        debug!(
            "Creating direct mapped cache with {num_lines} lines of {block_size} words (offset {offset_bits} bits, index {index_bits} bits, tag {} bits)",
            u64::BITS - offset_bits - index_bits
        );
        Ok(Self {
            lower,
            name: String::from("cache"),
            lines,
            block_size,
            offset_bits,
            index_bits,
            block_alignment_bit_mask: !low_bits_mask(offset_bits),
            index_bit_mask: low_bits_mask(index_bits),
            stats: AccessStats::default(),
        })
    }

    /// Sets the name used when reporting results
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Splits an address into tag, line index and word offset
    pub fn decompose(&self, address: u64) -> AddressParts {
        let tag_shift = self.offset_bits + self.index_bits;
        AddressParts {
            tag: address.checked_shr(tag_shift).unwrap_or(0),
            index: (address.checked_shr(self.offset_bits).unwrap_or(0) & self.index_bit_mask) as usize,
            offset: ((address & !self.block_alignment_bit_mask) >> WORD_BITS) as usize,
        }
    }

    /// Classifies an access without performing it. Nothing is updated
    pub fn probe(&self, address: u64) -> AccessKind {
        let parts = self.decompose(address);
        if self.lines[parts.index].holds(parts.tag) {
            AccessKind::Hit
        } else {
            AccessKind::Miss
        }
    }

    /// Makes sure the line for `address` holds its block, filling it from the lower level on a miss
    ///
    /// A failed fill leaves the line invalid, so a partially fetched block can never hit later
    fn ensure_line(&mut self, address: u64, parts: AddressParts) -> Result<()> {
        if self.lines[parts.index].holds(parts.tag) {
            trace!("{}: hit at 0x{address:X} (line {})", self.name, parts.index);
            self.stats.hits += 1;
            return Ok(());
        }
        self.stats.misses += 1;
        let line = &mut self.lines[parts.index];
        if let Some(old) = line.tag {
            trace!("{}: miss at 0x{address:X}, evicting tag 0x{old:X} from line {}", self.name, parts.index);
        } else {
            trace!("{}: miss at 0x{address:X}, filling cold line {}", self.name, parts.index);
        }
        line.invalidate();
        let base = address & self.block_alignment_bit_mask;
        for i in 0..self.block_size {
            match self.lower.read(base + i * WORD_SIZE) {
                Ok(word) => line.blocks.push(word),
                Err(e) => {
                    warn!("{}: fill of line {} failed, line invalidated: {e}", self.name, parts.index);
                    line.invalidate();
                    return Err(e);
                }
            }
        }
        line.tag = Some(parts.tag);
        line.valid = true;
        Ok(())
    }

    /// Invalidates the line holding the word at `address`, if it is cached
    fn invalidate_word(&mut self, address: u64) {
        let parts = self.decompose(address);
        let line = &mut self.lines[parts.index];
        if line.holds(parts.tag) {
            trace!("{}: dropping line {} overlapped by a sub-word write", self.name, parts.index);
            line.invalidate();
        }
    }

    /// Invalidates every line, returning the cache to its cold state. The lower level is untouched,
    /// with write-through there is never anything to flush
    pub fn invalidate_all(&mut self) {
        self.lines.iter_mut().for_each(CacheLine::invalidate);
    }

    pub fn line(&self, index: usize) -> Option<&CacheLine> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> &[CacheLine] {
        &self.lines
    }

    pub fn num_lines(&self) -> u64 {
        self.lines.len() as u64
    }

    /// Words per line
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }

    pub fn tag_bits(&self) -> u32 {
        u64::BITS - self.offset_bits - self.index_bits
    }

    /// Gets the number of valid lines. Useful for analysing cache performance or debugging
    pub fn valid_line_count(&self) -> usize {
        self.lines.iter().filter(|l| l.is_valid()).count()
    }

    pub fn lower(&self) -> &M {
        &self.lower
    }

    /// Direct access to the lower level. Writes made through this bypass the cache and may leave
    /// lines stale, call invalidate_all afterwards if that matters
    pub fn lower_mut(&mut self) -> &mut M {
        &mut self.lower
    }

    pub fn into_inner(self) -> M {
        self.lower
    }
}

impl<M: Memory> Memory for DirectMappedCache<M> {
    fn read(&mut self, address: u64) -> Result<u64> {
        self.stats.reads += 1;
        // Sub-word addresses are the lower level's call to make
        if address % WORD_SIZE != 0 {
            self.stats.bypasses += 1;
            return self.lower.read(address);
        }
        let parts = self.decompose(address);
        self.ensure_line(address, parts)?;
        Ok(self.lines[parts.index].blocks[parts.offset])
    }

    fn write(&mut self, word: u64, address: u64) -> Result<()> {
        self.stats.writes += 1;
        if address % WORD_SIZE != 0 {
            self.stats.bypasses += 1;
            self.lower.write(word, address)?;
            // A lower level with byte granularity may have changed the two words the write straddles
            let first = address & !(WORD_SIZE - 1);
            self.invalidate_word(first);
            if let Some(second) = first.checked_add(WORD_SIZE) {
                self.invalidate_word(second);
            }
            return Ok(());
        }
        let parts = self.decompose(address);
        self.ensure_line(address, parts)?;
        self.lines[parts.index].blocks[parts.offset] = word;
        if let Err(e) = self.lower.write(word, address) {
            warn!("{}: write-through at 0x{address:X} failed, line {} invalidated: {e}", self.name, parts.index);
            self.lines[parts.index].invalidate();
            return Err(e);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn stats(&self) -> AccessStats {
        self.stats
    }

    fn lower_level(&self) -> Option<&dyn Memory> {
        Some(&self.lower)
    }
}

/// A mask with the lowest `bits` bits set, valid for the full 0..=64 range
fn low_bits_mask(bits: u32) -> u64 {
    1u64.checked_shl(bits).map_or(u64::MAX, |b| b - 1)
}
