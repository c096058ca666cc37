//! ROM image loading and validation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::memory::MAX_PROGRAM_BYTES;

/// Reasons a program image is refused.
#[derive(Debug, Error)]
pub enum RomError {
    /// Image contains no bytes.
    #[error("ROM image is empty")]
    Empty,
    /// Image is larger than the program area.
    #[error("ROM image is {len} bytes, limit is {max}", max = MAX_PROGRAM_BYTES)]
    TooLarge {
        /// Image length in bytes.
        len: usize,
    },
    /// Image file could not be read.
    #[error("failed to read ROM file {}", path.display())]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Checks that `image` is a loadable program: non-empty and at most
/// [`MAX_PROGRAM_BYTES`] long.
///
/// # Errors
///
/// Returns [`RomError::Empty`] or [`RomError::TooLarge`].
pub fn validate_rom(image: &[u8]) -> Result<(), RomError> {
    if image.is_empty() {
        Err(RomError::Empty)
    } else if image.len() > MAX_PROGRAM_BYTES {
        Err(RomError::TooLarge { len: image.len() })
    } else {
        Ok(())
    }
}

/// Reads and validates a ROM image from disk.
///
/// # Errors
///
/// Returns [`RomError::Io`] when the file cannot be read, otherwise any
/// [`validate_rom`] failure.
pub fn load_rom_file(path: impl AsRef<Path>) -> Result<Vec<u8>, RomError> {
    let path = path.as_ref();
    let image = fs::read(path).map_err(|source| RomError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    validate_rom(&image)?;
    Ok(image)
}
