//! Instruction disassembly for the D5700 ISA.

use std::fmt;

use crate::decoder::Decoder;
use crate::encoding::HALT_WORD;

/// A single disassembled instruction word.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DisassemblyRow {
    /// Address of the word.
    pub address: u16,
    /// Raw big-endian word.
    pub word: u16,
    /// Assembly text, e.g. `ADD r1, r2, r3` or `HALT`.
    pub text: String,
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}: {:04X}  {}", self.address, self.word, self.text)
    }
}

/// Disassembles the word at `address`, or `None` when it lies outside
/// `memory`. A trailing odd byte is padded with zero.
#[must_use]
pub fn disassemble_one(address: u16, memory: &[u8]) -> Option<DisassemblyRow> {
    let start = usize::from(address);
    let high = *memory.get(start)?;
    let low = memory.get(start + 1).copied().unwrap_or(0);
    let word = u16::from_be_bytes([high, low]);

    let text = if word == HALT_WORD {
        String::from("HALT")
    } else {
        match Decoder::decode(word) {
            Ok(instruction) => instruction.to_string(),
            Err(_) => format!(".word {word:#06X} ; ILLEGAL"),
        }
    };

    Some(DisassemblyRow {
        address,
        word,
        text,
    })
}

/// Disassembles a whole program image from address zero.
#[must_use]
pub fn disassemble(image: &[u8]) -> Vec<DisassemblyRow> {
    (0..image.len())
        .step_by(2)
        .filter_map(|start| u16::try_from(start).ok())
        .filter_map(|address| disassemble_one(address, image))
        .collect()
}

/// Disassembles up to `before` words ahead of `center` and `after` words
/// following it. Rows outside `memory` are omitted.
#[must_use]
pub fn disassemble_window(
    center: u16,
    before: u16,
    after: u16,
    memory: &[u8],
) -> Vec<DisassemblyRow> {
    let first = center.saturating_sub(before.saturating_mul(2));
    let last = center.saturating_add(after.saturating_mul(2));
    (first..=last)
        .step_by(2)
        .filter_map(|address| disassemble_one(address, memory))
        .collect()
}
