//! ROM and RAM data-memory banks with fixed D5700 geometry.

/// Address and write legality checks shared by both banks.
pub mod access;
/// Bank storage types behind the [`DataMemory`] contract.
pub mod bank;

pub use access::{validate_address, validate_jump_target, validate_write_access};
pub use bank::{DataMemory, MemoryBank, Ram, Rom};

/// Size in bytes of each memory bank (4 KiB).
pub const BANK_BYTES: usize = 4096;

/// Bytes at the top of the address space a program image may not occupy.
pub const RESERVED_TAIL_BYTES: usize = 0x200;

/// Largest accepted program image.
pub const MAX_PROGRAM_BYTES: usize = BANK_BYTES - RESERVED_TAIL_BYTES;

/// Allocates a zeroed bank-sized backing store.
#[must_use]
pub fn new_bank_storage() -> Box<[u8]> {
    vec![0; BANK_BYTES].into_boxed_slice()
}
