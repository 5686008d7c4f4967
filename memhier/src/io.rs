use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use crate::error::{Error, Result};

/// The raw bytes of a trace file, either memory mapped or read into a buffer
pub enum TraceBytes {
    #[cfg(unix)]
    Mapped(memmap2::Mmap),
    Buffered(Vec<u8>),
}

impl Deref for TraceBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            #[cfg(unix)]
            TraceBytes::Mapped(m) => m,
            TraceBytes::Buffered(b) => b,
        }
    }
}

/// Loads a trace file. Traces are only ever scanned front to back
pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<TraceBytes> {
    let path = path.as_ref();
    let to_io_error = |source| Error::Io { path: path.to_path_buf(), source };
    let file = File::open(path).map_err(to_io_error)?;
    // Compatibility on other systems, and mapping an empty file fails on some of them
    let length = file.metadata().map_err(to_io_error)?.len();
    #[cfg(unix)]
    if length > 0 {
        use memmap2::{Advice, Mmap};
        // Safe as long as nothing truncates the trace while it's being simulated
        let m = unsafe { Mmap::map(&file) }.map_err(to_io_error)?;
        m.advise(Advice::Sequential).map_err(to_io_error)?;
        return Ok(TraceBytes::Mapped(m));
    }
    use std::io::Read;
    let mut buffer = Vec::with_capacity(length as usize);
    std::io::BufReader::new(file).read_to_end(&mut buffer).map_err(to_io_error)?;
    Ok(TraceBytes::Buffered(buffer))
}
