use std::fmt;

use crate::memory::{new_bank_storage, validate_address, validate_write_access, BANK_BYTES};
use crate::rom::RomError;
use crate::Fault;

/// Identifies one of the two data-memory banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryBank {
    /// Read/write working memory, selected after reset.
    #[default]
    Ram,
    /// Program image; read-only.
    Rom,
}

impl fmt::Display for MemoryBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ram => f.write_str("RAM"),
            Self::Rom => f.write_str("ROM"),
        }
    }
}

/// Uniform byte-level read/write contract shared by ROM and RAM.
pub trait DataMemory {
    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::AddressOutOfRange`] past the end of the bank.
    fn read_byte(&self, address: u16) -> Result<u8, Fault>;

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::RomWriteRejected`] for ROM and
    /// [`Fault::AddressOutOfRange`] past the end of RAM.
    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), Fault>;
}

/// Read-only program memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rom {
    bytes: Box<[u8]>,
}

impl Default for Rom {
    fn default() -> Self {
        Self {
            bytes: new_bank_storage(),
        }
    }
}

impl Rom {
    /// Builds a ROM holding `program` at offset 0, zero-filled after it.
    ///
    /// # Errors
    ///
    /// Returns [`RomError::TooLarge`] when `program` exceeds the bank.
    pub fn with_program(program: &[u8]) -> Result<Self, RomError> {
        let mut rom = Self::default();
        rom.load(program)?;
        Ok(rom)
    }

    /// Replaces the ROM contents with `program`.
    ///
    /// # Errors
    ///
    /// Returns [`RomError::TooLarge`] when `program` exceeds the bank.
    pub fn load(&mut self, program: &[u8]) -> Result<(), RomError> {
        if program.len() > BANK_BYTES {
            return Err(RomError::TooLarge { len: program.len() });
        }
        self.bytes.fill(0);
        self.bytes[..program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Fetches the big-endian instruction word at `pc`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::AddressOutOfRange`] when either byte lies past the
    /// end of ROM.
    pub fn fetch_word(&self, pc: u16) -> Result<u16, Fault> {
        let high = self.read_byte(pc)?;
        let low_address = pc.checked_add(1).ok_or(Fault::AddressOutOfRange {
            bank: MemoryBank::Rom,
            address: pc,
        })?;
        let low = self.read_byte(low_address)?;
        Ok(u16::from_be_bytes([high, low]))
    }

    /// Raw ROM contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl DataMemory for Rom {
    fn read_byte(&self, address: u16) -> Result<u8, Fault> {
        let index = validate_address(MemoryBank::Rom, address)?;
        Ok(self.bytes[index])
    }

    fn write_byte(&mut self, address: u16, _value: u8) -> Result<(), Fault> {
        validate_write_access(MemoryBank::Rom, address).map(|_| ())
    }
}

/// Zero-initialised working memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ram {
    bytes: Box<[u8]>,
}

impl Default for Ram {
    fn default() -> Self {
        Self {
            bytes: new_bank_storage(),
        }
    }
}

impl Ram {
    /// Zeroes every byte.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Raw RAM contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl DataMemory for Ram {
    fn read_byte(&self, address: u16) -> Result<u8, Fault> {
        let index = validate_address(MemoryBank::Ram, address)?;
        Ok(self.bytes[index])
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), Fault> {
        let index = validate_write_access(MemoryBank::Ram, address)?;
        self.bytes[index] = value;
        Ok(())
    }
}
