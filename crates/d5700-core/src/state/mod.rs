//! Architectural CPU state and lifecycle state primitives.

/// Registers plus both memory banks.
pub mod cpu_state;
/// Register file types and storage model.
pub mod registers;
/// Lifecycle state machine.
pub mod run_state;

pub use cpu_state::CpuState;
pub use registers::{GeneralRegister, RegisterFile, GENERAL_REGISTER_COUNT};
pub use run_state::{LifecycleError, LifecycleState};
