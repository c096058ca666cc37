//! Helper functions for instruction execution.

use crate::memory::validate_write_access;
use crate::state::{CpuState, GeneralRegister};
use crate::Fault;

/// Resolves a raw register field to an architectural register.
pub(super) const fn register(field: u8) -> Result<GeneralRegister, Fault> {
    GeneralRegister::try_from_u4(field)
}

/// Reads the register named by a raw field.
pub(super) fn read_register(state: &CpuState, field: u8) -> Result<u8, Fault> {
    Ok(state.registers.gpr(register(field)?))
}

/// Hundreds, tens and ones digits of `value`, as raw values `0..=9`.
#[must_use]
pub const fn base10_digits(value: u8) -> [u8; 3] {
    [value / 100, (value % 100) / 10, value % 10]
}

/// ASCII character for a hex digit: `0..=9` map to `'0'..='9'`, `0xA..=0xF`
/// to `'A'..='F'`.
///
/// # Errors
///
/// Returns [`Fault::AsciiValueOutOfRange`] for values above `0xF`.
pub const fn ascii_hex_digit(value: u8) -> Result<u8, Fault> {
    match value {
        0..=9 => Ok(b'0' + value),
        0xA..=0xF => Ok(b'A' + value - 0xA),
        _ => Err(Fault::AsciiValueOutOfRange { value }),
    }
}

/// Checks that `count` consecutive writes starting at `A` would all succeed.
pub(super) fn validate_write_run(state: &CpuState, count: u16) -> Result<(), Fault> {
    let bank = state.data_bank();
    let base = state.registers.address();
    for offset in 0..count {
        let address = base.checked_add(offset).ok_or(Fault::AddressOutOfRange {
            bank,
            address: u16::MAX,
        })?;
        validate_write_access(bank, address)?;
    }
    Ok(())
}
