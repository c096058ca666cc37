/// Instruction word reserved as HALT; intercepted before decode.
pub const HALT_WORD: u16 = 0x0000;

/// Primary opcodes (`OP` field, bits 15..12). All sixteen values are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    Store = 0x0,
    Add = 0x1,
    Sub = 0x2,
    Read = 0x3,
    Write = 0x4,
    Jump = 0x5,
    ReadKeyboard = 0x6,
    SwitchMemory = 0x7,
    SkipIfEqual = 0x8,
    SkipIfNotEqual = 0x9,
    SetAddress = 0xA,
    SetTimer = 0xB,
    ReadTimer = 0xC,
    ConvertToBase10 = 0xD,
    ConvertToAscii = 0xE,
    Draw = 0xF,
}

impl Opcode {
    /// Every opcode in numeric order.
    pub const ALL: [Self; 16] = [
        Self::Store,
        Self::Add,
        Self::Sub,
        Self::Read,
        Self::Write,
        Self::Jump,
        Self::ReadKeyboard,
        Self::SwitchMemory,
        Self::SkipIfEqual,
        Self::SkipIfNotEqual,
        Self::SetAddress,
        Self::SetTimer,
        Self::ReadTimer,
        Self::ConvertToBase10,
        Self::ConvertToAscii,
        Self::Draw,
    ];

    /// Converts a 4-bit opcode value.
    #[must_use]
    pub const fn from_u4(op: u8) -> Option<Self> {
        match op {
            0x0 => Some(Self::Store),
            0x1 => Some(Self::Add),
            0x2 => Some(Self::Sub),
            0x3 => Some(Self::Read),
            0x4 => Some(Self::Write),
            0x5 => Some(Self::Jump),
            0x6 => Some(Self::ReadKeyboard),
            0x7 => Some(Self::SwitchMemory),
            0x8 => Some(Self::SkipIfEqual),
            0x9 => Some(Self::SkipIfNotEqual),
            0xA => Some(Self::SetAddress),
            0xB => Some(Self::SetTimer),
            0xC => Some(Self::ReadTimer),
            0xD => Some(Self::ConvertToBase10),
            0xE => Some(Self::ConvertToAscii),
            0xF => Some(Self::Draw),
            _ => None,
        }
    }

    /// Numeric opcode value.
    #[must_use]
    pub const fn as_u4(self) -> u8 {
        self as u8
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Store => "STORE",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Jump => "JUMP",
            Self::ReadKeyboard => "READ_KEYBOARD",
            Self::SwitchMemory => "SWITCH_MEMORY",
            Self::SkipIfEqual => "SKIP_EQUAL",
            Self::SkipIfNotEqual => "SKIP_NOT_EQUAL",
            Self::SetAddress => "SET_A",
            Self::SetTimer => "SET_T",
            Self::ReadTimer => "READ_T",
            Self::ConvertToBase10 => "CONVERT_TO_BASE_10",
            Self::ConvertToAscii => "CONVERT_BYTE_TO_ASCII",
            Self::Draw => "DRAW",
        }
    }
}

/// Bits 15..12.
#[must_use]
pub const fn opcode_field(word: u16) -> u8 {
    ((word >> 12) & 0xF) as u8
}

/// Bits 11..8 (`rX`).
#[must_use]
pub const fn rx_field(word: u16) -> u8 {
    ((word >> 8) & 0xF) as u8
}

/// Bits 7..4 (`rY`).
#[must_use]
pub const fn ry_field(word: u16) -> u8 {
    ((word >> 4) & 0xF) as u8
}

/// Bits 3..0 (`rZ`).
#[must_use]
pub const fn rz_field(word: u16) -> u8 {
    (word & 0xF) as u8
}

/// Bits 11..0, the 12-bit address operand.
#[must_use]
pub const fn address_field(word: u16) -> u16 {
    word & 0x0FFF
}

/// Bits 7..0, the `STORE` immediate.
#[must_use]
pub const fn low_byte_field(word: u16) -> u8 {
    (word & 0xFF) as u8
}

/// Bits 11..4, the `SET_T` immediate.
#[must_use]
pub const fn middle_byte_field(word: u16) -> u8 {
    ((word >> 4) & 0xFF) as u8
}
