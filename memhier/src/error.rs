use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why an addressable store rejected an address
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ViolationKind {
    /// The address is not a multiple of the word width
    Misaligned,
    /// The word at the address does not fit inside the store
    OutOfBounds,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Misaligned => write!(f, "misaligned"),
            ViolationKind::OutOfBounds => write!(f, "out of bounds"),
        }
    }
}

/// Errors raised by stores, caches and the simulator
#[derive(Debug, Error)]
pub enum Error {
    /// Raised by the authoritative store for an address it cannot serve. Caches never raise this
    /// themselves, they pass it through from the level below
    #[error("Address violation at 0x{address:016X}: {reason}")]
    AddressViolation { address: u64, reason: ViolationKind },

    #[error("Couldn't access the backing file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid cache geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid hierarchy configuration: {0}")]
    Config(String),

    #[error("Couldn't parse trace line {line}: {reason}")]
    Trace { line: usize, reason: String },
}

impl Error {
    /// True if this is an address violation, regardless of the reason
    pub fn is_address_violation(&self) -> bool {
        matches!(self, Error::AddressViolation { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
