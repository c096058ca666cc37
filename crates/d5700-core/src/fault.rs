use thiserror::Error;

use crate::memory::MemoryBank;

/// Fault classes used for log aggregation and exit-status policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Decoder rejected an instruction word.
    Decode,
    /// Data memory or instruction fetch violated the bank geometry or policy.
    Memory,
    /// Program-counter control flow violation.
    Control,
    /// Instruction named a register that does not exist.
    Register,
    /// Numeric conversion instruction received an out-of-domain value.
    Conversion,
    /// Draw instruction violated the display contract.
    Display,
}

/// Fatal execution errors raised by fetch, decode and execute.
///
/// Any fault aborts the current run: the instruction clock catches it at the
/// tick boundary, records it as the halt cause and drives the lifecycle to
/// `Halted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// Opcode nibble has no assigned instruction.
    #[error("unknown opcode {opcode:#X}")]
    IllegalOpcode {
        /// Raw 4-bit opcode value.
        opcode: u8,
    },
    /// Data access or fetch outside `0x000..=0xFFF`.
    #[error("{bank} address {address:#06X} out of bounds (0x0000-0x0FFF)")]
    AddressOutOfRange {
        /// Bank the access targeted.
        bank: MemoryBank,
        /// Offending address.
        address: u16,
    },
    /// Write attempted while ROM is the selected data bank.
    #[error("cannot write to ROM at address {address:#06X}")]
    RomWriteRejected {
        /// Target address of the rejected write.
        address: u16,
    },
    /// `JUMP` target is not word aligned.
    #[error("jump address must be even, got {address:#05X}")]
    OddJumpAddress {
        /// Requested jump target.
        address: u16,
    },
    /// Explicit program-counter write with an odd value.
    #[error("program counter must be even, got {value:#06X}")]
    MisalignedProgramCounter {
        /// Rejected program-counter value.
        value: u16,
    },
    /// Register field selects an index outside `R0..=R7`.
    #[error("register index {index} does not exist (r0-r7)")]
    InvalidRegister {
        /// Raw 4-bit register field.
        index: u8,
    },
    /// ASCII conversion source is larger than a single hex digit.
    #[error("value for ASCII conversion must be 0-F, got {value:#04X}")]
    AsciiValueOutOfRange {
        /// Offending register value.
        value: u8,
    },
    /// Draw value is outside 7-bit ASCII.
    #[error("cannot draw non-ASCII value {value:#04X}")]
    DrawValueOutOfRange {
        /// Offending register value.
        value: u8,
    },
    /// Draw coordinate lies outside the 8x8 display.
    #[error("pixel ({x}, {y}) is outside the 8x8 display")]
    PixelOutOfRange {
        /// Row coordinate.
        x: u8,
        /// Column coordinate.
        y: u8,
    },
}

impl Fault {
    /// Stable numeric code for this fault, used as the CLI exit status.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::IllegalOpcode { .. } => 0x01,
            Self::AddressOutOfRange { .. } => 0x02,
            Self::RomWriteRejected { .. } => 0x03,
            Self::OddJumpAddress { .. } => 0x04,
            Self::MisalignedProgramCounter { .. } => 0x05,
            Self::InvalidRegister { .. } => 0x06,
            Self::AsciiValueOutOfRange { .. } => 0x07,
            Self::DrawValueOutOfRange { .. } => 0x08,
            Self::PixelOutOfRange { .. } => 0x09,
        }
    }

    /// Returns the aggregation class for this fault.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::IllegalOpcode { .. } => FaultClass::Decode,
            Self::AddressOutOfRange { .. } | Self::RomWriteRejected { .. } => FaultClass::Memory,
            Self::OddJumpAddress { .. } | Self::MisalignedProgramCounter { .. } => {
                FaultClass::Control
            }
            Self::InvalidRegister { .. } => FaultClass::Register,
            Self::AsciiValueOutOfRange { .. } => FaultClass::Conversion,
            Self::DrawValueOutOfRange { .. } | Self::PixelOutOfRange { .. } => FaultClass::Display,
        }
    }
}
