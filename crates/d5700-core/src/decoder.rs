//! Instruction decoder for the D5700 ISA.
//!
//! Register operands are kept as raw 4-bit fields. Resolving them against the
//! eight architectural registers happens at execute time, so a field naming
//! `r8`..`r15` still decodes and faults only when the instruction runs.

use std::fmt;

use crate::encoding::{
    address_field, low_byte_field, middle_byte_field, opcode_field, rx_field, ry_field, rz_field,
    Opcode,
};
use crate::Fault;

/// Decoded instruction. Never mutated after decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Instruction {
    /// `rX = value`.
    Store { rx: u8, value: u8 },
    /// `rZ = rX + rY`, wrapping.
    Add { rx: u8, ry: u8, rz: u8 },
    /// `rZ = rX - rY`, clamped at zero.
    Sub { rx: u8, ry: u8, rz: u8 },
    /// `rX = data[A]`.
    Read { rx: u8 },
    /// `data[A] = rX`.
    Write { rx: u8 },
    /// `PC = address`.
    Jump { address: u16 },
    /// `rX = keyboard byte`.
    ReadKeyboard { rx: u8 },
    /// Flip the data-memory bank.
    SwitchMemory,
    /// Skip the next instruction when `rX == rY`.
    SkipIfEqual { rx: u8, ry: u8 },
    /// Skip the next instruction when `rX != rY`.
    SkipIfNotEqual { rx: u8, ry: u8 },
    /// `A = address`.
    SetAddress { address: u16 },
    /// `T = value`.
    SetTimer { value: u8 },
    /// `rX = T`.
    ReadTimer { rx: u8 },
    /// Decimal digits of `rX` to `data[A..A+3]`.
    ConvertToBase10 { rx: u8 },
    /// `rY = ASCII hex digit of rX`.
    ConvertToAscii { rx: u8, ry: u8 },
    /// Display cell `(ry, rz)` = `rX`; `ry`/`rz` are coordinates, not registers.
    Draw { rx: u8, ry: u8, rz: u8 },
}

impl Instruction {
    /// Opcode tag of this instruction.
    #[must_use]
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Store { .. } => Opcode::Store,
            Self::Add { .. } => Opcode::Add,
            Self::Sub { .. } => Opcode::Sub,
            Self::Read { .. } => Opcode::Read,
            Self::Write { .. } => Opcode::Write,
            Self::Jump { .. } => Opcode::Jump,
            Self::ReadKeyboard { .. } => Opcode::ReadKeyboard,
            Self::SwitchMemory => Opcode::SwitchMemory,
            Self::SkipIfEqual { .. } => Opcode::SkipIfEqual,
            Self::SkipIfNotEqual { .. } => Opcode::SkipIfNotEqual,
            Self::SetAddress { .. } => Opcode::SetAddress,
            Self::SetTimer { .. } => Opcode::SetTimer,
            Self::ReadTimer { .. } => Opcode::ReadTimer,
            Self::ConvertToBase10 { .. } => Opcode::ConvertToBase10,
            Self::ConvertToAscii { .. } => Opcode::ConvertToAscii,
            Self::Draw { .. } => Opcode::Draw,
        }
    }

    /// Re-encodes this instruction to a 16-bit word.
    ///
    /// Fields the opcode does not use are encoded as zero.
    #[must_use]
    pub fn encode(self) -> u16 {
        let op = u16::from(self.opcode().as_u4()) << 12;
        let regs = |rx: u8, ry: u8, rz: u8| {
            (u16::from(rx & 0xF) << 8) | (u16::from(ry & 0xF) << 4) | u16::from(rz & 0xF)
        };

        op | match self {
            Self::Store { rx, value } => (u16::from(rx & 0xF) << 8) | u16::from(value),
            Self::Add { rx, ry, rz } | Self::Sub { rx, ry, rz } | Self::Draw { rx, ry, rz } => {
                regs(rx, ry, rz)
            }
            Self::Read { rx }
            | Self::Write { rx }
            | Self::ReadKeyboard { rx }
            | Self::ReadTimer { rx }
            | Self::ConvertToBase10 { rx } => regs(rx, 0, 0),
            Self::SkipIfEqual { rx, ry }
            | Self::SkipIfNotEqual { rx, ry }
            | Self::ConvertToAscii { rx, ry } => regs(rx, ry, 0),
            Self::Jump { address } | Self::SetAddress { address } => address & 0x0FFF,
            Self::SetTimer { value } => u16::from(value) << 4,
            Self::SwitchMemory => 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.opcode().mnemonic();
        match *self {
            Self::Store { rx, value } => write!(f, "{mnemonic} r{rx}, {value:#04X}"),
            Self::Add { rx, ry, rz } | Self::Sub { rx, ry, rz } => {
                write!(f, "{mnemonic} r{rx}, r{ry}, r{rz}")
            }
            Self::Read { rx }
            | Self::Write { rx }
            | Self::ReadKeyboard { rx }
            | Self::ReadTimer { rx }
            | Self::ConvertToBase10 { rx } => write!(f, "{mnemonic} r{rx}"),
            Self::SkipIfEqual { rx, ry }
            | Self::SkipIfNotEqual { rx, ry }
            | Self::ConvertToAscii { rx, ry } => write!(f, "{mnemonic} r{rx}, r{ry}"),
            Self::Jump { address } | Self::SetAddress { address } => {
                write!(f, "{mnemonic} {address:#05X}")
            }
            Self::SetTimer { value } => write!(f, "{mnemonic} {value:#04X}"),
            Self::Draw { rx, ry, rz } => write!(f, "{mnemonic} r{rx}, {ry}, {rz}"),
            Self::SwitchMemory => f.write_str(mnemonic),
        }
    }
}

/// Instruction decoder for the D5700 ISA.
pub struct Decoder;

impl Decoder {
    /// Decodes a 16-bit instruction word.
    ///
    /// The HALT word `0x0000` is not special here: it decodes as
    /// `STORE r0, 0x00`. The CPU loop recognises HALT before calling the
    /// decoder.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::IllegalOpcode`] for an unassigned opcode. Every 4-bit
    /// opcode is currently assigned.
    pub const fn decode(word: u16) -> Result<Instruction, Fault> {
        let op = opcode_field(word);
        let Some(opcode) = Opcode::from_u4(op) else {
            return Err(Fault::IllegalOpcode { opcode: op });
        };

        let rx = rx_field(word);
        let ry = ry_field(word);
        let rz = rz_field(word);

        let instruction = match opcode {
            Opcode::Store => Instruction::Store {
                rx,
                value: low_byte_field(word),
            },
            Opcode::Add => Instruction::Add { rx, ry, rz },
            Opcode::Sub => Instruction::Sub { rx, ry, rz },
            Opcode::Read => Instruction::Read { rx },
            Opcode::Write => Instruction::Write { rx },
            Opcode::Jump => Instruction::Jump {
                address: address_field(word),
            },
            Opcode::ReadKeyboard => Instruction::ReadKeyboard { rx },
            Opcode::SwitchMemory => Instruction::SwitchMemory,
            Opcode::SkipIfEqual => Instruction::SkipIfEqual { rx, ry },
            Opcode::SkipIfNotEqual => Instruction::SkipIfNotEqual { rx, ry },
            Opcode::SetAddress => Instruction::SetAddress {
                address: address_field(word),
            },
            Opcode::SetTimer => Instruction::SetTimer {
                value: middle_byte_field(word),
            },
            Opcode::ReadTimer => Instruction::ReadTimer { rx },
            Opcode::ConvertToBase10 => Instruction::ConvertToBase10 { rx },
            Opcode::ConvertToAscii => Instruction::ConvertToAscii { rx, ry },
            Opcode::Draw => Instruction::Draw { rx, ry, rz },
        };

        Ok(instruction)
    }
}
