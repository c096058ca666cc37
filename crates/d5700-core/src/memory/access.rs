//! Deterministic access policy helpers for the two data banks.

use crate::memory::{MemoryBank, BANK_BYTES};
use crate::Fault;

/// Validates that `address` lies inside a bank and returns it as an index.
///
/// Out-of-range addresses are a fault, never wrapped or clamped.
///
/// # Errors
///
/// Returns [`Fault::AddressOutOfRange`] when `address >= 4096`.
pub fn validate_address(bank: MemoryBank, address: u16) -> Result<usize, Fault> {
    let index = usize::from(address);
    if index < BANK_BYTES {
        Ok(index)
    } else {
        Err(Fault::AddressOutOfRange { bank, address })
    }
}

/// Validates write legality for `address` in `bank`.
///
/// ROM rejects every write, regardless of address.
///
/// # Errors
///
/// Returns [`Fault::RomWriteRejected`] for ROM and
/// [`Fault::AddressOutOfRange`] for RAM addresses past the bank end.
pub fn validate_write_access(bank: MemoryBank, address: u16) -> Result<usize, Fault> {
    match bank {
        MemoryBank::Rom => Err(Fault::RomWriteRejected { address }),
        MemoryBank::Ram => validate_address(bank, address),
    }
}

/// Validates that a jump target is word aligned.
///
/// # Errors
///
/// Returns [`Fault::OddJumpAddress`] when `address` is odd.
pub const fn validate_jump_target(address: u16) -> Result<u16, Fault> {
    if address & 1 == 0 {
        Ok(address)
    } else {
        Err(Fault::OddJumpAddress { address })
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_address, validate_jump_target, validate_write_access};
    use crate::memory::MemoryBank;
    use crate::Fault;

    #[test]
    fn address_legality_matches_bank_geometry() {
        for bank in [MemoryBank::Rom, MemoryBank::Ram] {
            assert_eq!(validate_address(bank, 0x0000), Ok(0));
            assert_eq!(validate_address(bank, 0x0FFF), Ok(0x0FFF));
            assert_eq!(
                validate_address(bank, 0x1000),
                Err(Fault::AddressOutOfRange {
                    bank,
                    address: 0x1000
                })
            );
            assert_eq!(
                validate_address(bank, u16::MAX),
                Err(Fault::AddressOutOfRange {
                    bank,
                    address: u16::MAX
                })
            );
        }
    }

    #[test]
    fn rom_rejects_every_write() {
        for address in [0x0000, 0x0100, 0x0FFF, 0x1000] {
            assert_eq!(
                validate_write_access(MemoryBank::Rom, address),
                Err(Fault::RomWriteRejected { address })
            );
        }
    }

    #[test]
    fn ram_write_legality_is_deterministic_for_all_addresses() {
        for address in 0_u16..=u16::MAX {
            let result = validate_write_access(MemoryBank::Ram, address);
            if address < 0x1000 {
                assert_eq!(result, Ok(usize::from(address)));
            } else {
                assert!(result.is_err());
            }
        }
    }

    #[test]
    fn jump_targets_must_be_even() {
        assert_eq!(validate_jump_target(0x0000), Ok(0x0000));
        assert_eq!(validate_jump_target(0x0ABC), Ok(0x0ABC));
        assert_eq!(
            validate_jump_target(0x0ABD),
            Err(Fault::OddJumpAddress { address: 0x0ABD })
        );
    }
}
