use crate::memory::MemoryBank;
use crate::Fault;

/// Number of architecturally visible general-purpose registers (`r0..r7`).
pub const GENERAL_REGISTER_COUNT: usize = 8;

/// Architecturally visible general-purpose register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum GeneralRegister {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
}

impl GeneralRegister {
    /// Ordered list of all general-purpose registers.
    pub const ALL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
    ];

    /// Returns the array index for this register (`0..=7`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes a 4-bit register field. Indices 8..=15 name no register.
    #[must_use]
    pub const fn from_u4(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::R0),
            1 => Some(Self::R1),
            2 => Some(Self::R2),
            3 => Some(Self::R3),
            4 => Some(Self::R4),
            5 => Some(Self::R5),
            6 => Some(Self::R6),
            7 => Some(Self::R7),
            _ => None,
        }
    }

    /// Decodes a register field, faulting on indices with no register.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidRegister`] for `bits >= 8`.
    pub const fn try_from_u4(bits: u8) -> Result<Self, Fault> {
        match Self::from_u4(bits) {
            Some(reg) => Ok(reg),
            None => Err(Fault::InvalidRegister { index: bits }),
        }
    }
}

/// Full D5700 register state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    gpr: [u8; GENERAL_REGISTER_COUNT],
    address: u16,
    timer: u8,
    pc: u16,
    rom_selected: bool,
}

impl RegisterFile {
    /// Reads a general-purpose register.
    #[must_use]
    pub const fn gpr(&self, reg: GeneralRegister) -> u8 {
        self.gpr[reg.index()]
    }

    /// Writes a general-purpose register.
    pub const fn set_gpr(&mut self, reg: GeneralRegister, value: u8) {
        self.gpr[reg.index()] = value;
    }

    /// Reads the address register `A`.
    #[must_use]
    pub const fn address(&self) -> u16 {
        self.address
    }

    /// Writes the address register `A`.
    pub const fn set_address(&mut self, value: u16) {
        self.address = value;
    }

    /// Reads the timer register `T`.
    #[must_use]
    pub const fn timer(&self) -> u8 {
        self.timer
    }

    /// Writes the timer register `T`.
    pub const fn set_timer(&mut self, value: u8) {
        self.timer = value;
    }

    /// Decrements a non-zero timer and returns the new value.
    ///
    /// Returns `None` and leaves the register alone once it reached zero.
    pub const fn decrement_timer(&mut self) -> Option<u8> {
        if self.timer == 0 {
            None
        } else {
            self.timer -= 1;
            Some(self.timer)
        }
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    /// Writes the program counter.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MisalignedProgramCounter`] for odd values and leaves
    /// the counter unchanged.
    pub const fn set_pc(&mut self, value: u16) -> Result<(), Fault> {
        if value & 1 == 0 {
            self.pc = value;
            Ok(())
        } else {
            Err(Fault::MisalignedProgramCounter { value })
        }
    }

    /// Moves the program counter forward by `bytes`, wrapping at 16 bits.
    pub const fn advance_pc(&mut self, bytes: u16) {
        self.pc = self.pc.wrapping_add(bytes);
    }

    /// Moves the program counter back by `bytes`, wrapping at 16 bits.
    pub const fn rewind_pc(&mut self, bytes: u16) {
        self.pc = self.pc.wrapping_sub(bytes);
    }

    /// Raw memory-bank flag: `true` when ROM is the data-memory target.
    #[must_use]
    pub const fn bank_flag(&self) -> bool {
        self.rom_selected
    }

    /// Bank currently targeted by data-memory instructions.
    #[must_use]
    pub const fn memory_bank(&self) -> MemoryBank {
        if self.rom_selected {
            MemoryBank::Rom
        } else {
            MemoryBank::Ram
        }
    }

    /// Flips the memory-bank flag and returns the newly selected bank.
    pub const fn toggle_memory_bank(&mut self) -> MemoryBank {
        self.rom_selected = !self.rom_selected;
        self.memory_bank()
    }
}
