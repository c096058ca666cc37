//! Core emulator crate for the D5700 virtual CPU.

/// Data memory banks and access policy.
pub mod memory;
pub use memory::{
    validate_address, validate_jump_target, validate_write_access, DataMemory, MemoryBank, Ram,
    Rom, BANK_BYTES, MAX_PROGRAM_BYTES, RESERVED_TAIL_BYTES,
};

/// Register file, CPU context and lifecycle state primitives.
pub mod state;
pub use state::{
    CpuState, GeneralRegister, LifecycleError, LifecycleState, RegisterFile,
    GENERAL_REGISTER_COUNT,
};

/// Opcode table and instruction-word bit fields.
pub mod encoding;
pub use encoding::{Opcode, HALT_WORD};

/// Instruction decoder.
pub mod decoder;
pub use decoder::{Decoder, Instruction};

/// Instruction disassembly.
pub mod disasm;
pub use disasm::{disassemble, disassemble_one, disassemble_window, DisassemblyRow};

/// Fatal execution faults.
pub mod fault;
pub use fault::{Fault, FaultClass};

/// ROM image validation and file loading.
pub mod rom;
pub use rom::{load_rom_file, validate_rom, RomError};

/// Event types and the publish/subscribe bus.
pub mod event;
pub use event::{EmulatorEvent, EventBus, EventSubscriber, SharedSubscriber, SubscriberId};

/// Instruction execution.
pub mod execute;
pub use execute::{execute_instruction, ExecuteOutcome, PcAction};

/// Fetch-decode-execute loop.
pub mod cpu;
pub use cpu::{halt_message, Cpu, StepOutcome};

/// Keyboard, display and timer collaborators.
pub mod peripherals;
pub use peripherals::{
    Display, DisplaySink, FrameBuffer, KeyboardSource, LineKeyboard, RenderStyle,
    RenderedDisplay, ScriptedKeyboard, TimerMonitor,
};

/// Clock rates and shutdown timing.
pub mod config;
pub use config::EmulatorConfig;

/// Fixed-rate clock threads.
pub mod clock;

/// Controller error type.
pub mod error;
pub use error::EmulatorError;

/// Lifecycle controller.
pub mod emulator;
pub use emulator::{Emulator, HaltReason};

mod sync;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
