//! Instruction execution for the D5700 ISA.
//!
//! Each instruction is a function of the CPU context and the keyboard source
//! that yields a [`PcAction`] and at most one event. Execution is precise:
//! every operand and target is validated before the first side effect, so a
//! faulting instruction leaves registers and memory untouched.
//!
//! Instructions that raise an event (`SWITCH_MEMORY`, `SET_T`) do not mutate
//! state themselves; the CPU applies their effect when it delivers the event
//! to itself.

mod helpers;

pub use helpers::{ascii_hex_digit, base10_digits};

use helpers::{read_register, register, validate_write_run};

use crate::decoder::Instruction;
use crate::event::EmulatorEvent;
use crate::memory::validate_jump_target;
use crate::peripherals::{KeyboardSource, DISPLAY_SIZE};
use crate::state::CpuState;
use crate::Fault;

/// Largest value `DRAW` accepts.
pub const MAX_DRAW_VALUE: u8 = 0x7F;

/// Program-counter effect of an executed instruction.
///
/// The fetch has already advanced the counter by two, so [`PcAction::NoChange`]
/// is a net advance of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PcAction {
    /// Fall through to the next instruction.
    NoChange,
    /// Advance by a further number of bytes.
    Increment(u16),
    /// Continue at an absolute, already validated address.
    SetPc(u16),
}

/// Result of executing one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOutcome {
    /// Program-counter effect.
    pub pc_action: PcAction,
    /// Event to publish, if any.
    pub event: Option<EmulatorEvent>,
}

impl ExecuteOutcome {
    const fn next() -> Self {
        Self {
            pc_action: PcAction::NoChange,
            event: None,
        }
    }

    const fn with_pc(pc_action: PcAction) -> Self {
        Self {
            pc_action,
            event: None,
        }
    }

    const fn with_event(event: EmulatorEvent) -> Self {
        Self {
            pc_action: PcAction::NoChange,
            event: Some(event),
        }
    }
}

/// Executes one decoded instruction against `state`.
///
/// # Errors
///
/// Returns the [`Fault`] that makes the instruction illegal; `state` is
/// unchanged in that case.
pub fn execute_instruction(
    instruction: Instruction,
    state: &mut CpuState,
    keyboard: &mut dyn KeyboardSource,
) -> Result<ExecuteOutcome, Fault> {
    match instruction {
        Instruction::Store { rx, value } => {
            state.registers.set_gpr(register(rx)?, value);
            Ok(ExecuteOutcome::next())
        }
        Instruction::Add { rx, ry, rz } => {
            let sum = read_register(state, rx)?.wrapping_add(read_register(state, ry)?);
            state.registers.set_gpr(register(rz)?, sum);
            Ok(ExecuteOutcome::next())
        }
        Instruction::Sub { rx, ry, rz } => {
            let difference = read_register(state, rx)?.saturating_sub(read_register(state, ry)?);
            state.registers.set_gpr(register(rz)?, difference);
            Ok(ExecuteOutcome::next())
        }
        Instruction::Read { rx } => {
            let target = register(rx)?;
            let value = state.read_data(state.registers.address())?;
            state.registers.set_gpr(target, value);
            Ok(ExecuteOutcome::next())
        }
        Instruction::Write { rx } => {
            let value = read_register(state, rx)?;
            state.write_data(state.registers.address(), value)?;
            Ok(ExecuteOutcome::next())
        }
        Instruction::Jump { address } => {
            let target = validate_jump_target(address)?;
            Ok(ExecuteOutcome::with_pc(PcAction::SetPc(target)))
        }
        Instruction::ReadKeyboard { rx } => {
            let target = register(rx)?;
            let value = keyboard.read_hex_byte();
            state.registers.set_gpr(target, value);
            Ok(ExecuteOutcome::next())
        }
        Instruction::SwitchMemory => Ok(ExecuteOutcome::with_event(EmulatorEvent::SwitchMemory)),
        Instruction::SkipIfEqual { rx, ry } => {
            let equal = read_register(state, rx)? == read_register(state, ry)?;
            Ok(ExecuteOutcome::with_pc(skip_if(equal)))
        }
        Instruction::SkipIfNotEqual { rx, ry } => {
            let equal = read_register(state, rx)? == read_register(state, ry)?;
            Ok(ExecuteOutcome::with_pc(skip_if(!equal)))
        }
        Instruction::SetAddress { address } => {
            state.registers.set_address(address);
            Ok(ExecuteOutcome::next())
        }
        Instruction::SetTimer { value } => {
            Ok(ExecuteOutcome::with_event(EmulatorEvent::TimerSet(value)))
        }
        Instruction::ReadTimer { rx } => {
            let timer = state.registers.timer();
            state.registers.set_gpr(register(rx)?, timer);
            Ok(ExecuteOutcome::next())
        }
        Instruction::ConvertToBase10 { rx } => {
            let digits = base10_digits(read_register(state, rx)?);
            validate_write_run(state, 3)?;
            let base = state.registers.address();
            for (address, digit) in (base..).zip(digits) {
                state.write_data(address, digit)?;
            }
            Ok(ExecuteOutcome::next())
        }
        Instruction::ConvertToAscii { rx, ry } => {
            let target = register(ry)?;
            let ascii = ascii_hex_digit(read_register(state, rx)?)?;
            state.registers.set_gpr(target, ascii);
            Ok(ExecuteOutcome::next())
        }
        Instruction::Draw { rx, ry, rz } => {
            let value = read_register(state, rx)?;
            if value > MAX_DRAW_VALUE {
                return Err(Fault::DrawValueOutOfRange { value });
            }
            if usize::from(ry) >= DISPLAY_SIZE || usize::from(rz) >= DISPLAY_SIZE {
                return Err(Fault::PixelOutOfRange { x: ry, y: rz });
            }
            Ok(ExecuteOutcome::with_event(EmulatorEvent::DrawPixel {
                x: ry,
                y: rz,
                value,
            }))
        }
    }
}

const fn skip_if(condition: bool) -> PcAction {
    if condition {
        PcAction::Increment(2)
    } else {
        PcAction::NoChange
    }
}

#[cfg(test)]
mod tests {
    use super::{execute_instruction, ExecuteOutcome, PcAction};
    use crate::decoder::Instruction;
    use crate::event::EmulatorEvent;
    use crate::memory::MemoryBank;
    use crate::peripherals::ScriptedKeyboard;
    use crate::state::{CpuState, GeneralRegister};
    use crate::Fault;

    fn run(state: &mut CpuState, instruction: Instruction) -> Result<ExecuteOutcome, Fault> {
        execute_instruction(instruction, state, &mut ScriptedKeyboard::default())
    }

    #[test]
    fn store_then_add_wraps() {
        let mut state = CpuState::default();
        run(&mut state, Instruction::Store { rx: 0, value: 200 }).unwrap();
        run(&mut state, Instruction::Store { rx: 1, value: 100 }).unwrap();
        let outcome = run(&mut state, Instruction::Add { rx: 0, ry: 1, rz: 2 }).unwrap();
        assert_eq!(outcome.pc_action, PcAction::NoChange);
        assert_eq!(state.registers.gpr(GeneralRegister::R2), 44);
    }

    #[test]
    fn sub_clamps_at_zero() {
        let mut state = CpuState::default();
        state.registers.set_gpr(GeneralRegister::R0, 3);
        state.registers.set_gpr(GeneralRegister::R1, 9);
        run(&mut state, Instruction::Sub { rx: 0, ry: 1, rz: 2 }).unwrap();
        assert_eq!(state.registers.gpr(GeneralRegister::R2), 0);
        run(&mut state, Instruction::Sub { rx: 1, ry: 0, rz: 2 }).unwrap();
        assert_eq!(state.registers.gpr(GeneralRegister::R2), 6);
    }

    #[test]
    fn register_fields_past_r7_fault_without_side_effects() {
        let mut state = CpuState::default();
        state.registers.set_gpr(GeneralRegister::R0, 1);
        let before = state.clone();
        for instruction in [
            Instruction::Store { rx: 8, value: 1 },
            Instruction::Add { rx: 0, ry: 0, rz: 9 },
            Instruction::Read { rx: 15 },
            Instruction::ConvertToAscii { rx: 0, ry: 12 },
        ] {
            let err = run(&mut state, instruction).unwrap_err();
            assert!(matches!(err, Fault::InvalidRegister { .. }), "{instruction}");
        }
        assert_eq!(state, before);
    }

    #[test]
    fn write_while_rom_selected_is_fatal() {
        let mut state = CpuState::with_program(&[0x70, 0x00]).unwrap();
        state.react(&EmulatorEvent::SwitchMemory);
        state.registers.set_address(0x0010);
        assert_eq!(
            run(&mut state, Instruction::Write { rx: 0 }),
            Err(Fault::RomWriteRejected { address: 0x0010 })
        );
    }

    #[test]
    fn read_uses_selected_bank() {
        let mut state = CpuState::with_program(&[0x70, 0x00]).unwrap();
        state.registers.set_address(0);
        run(&mut state, Instruction::Read { rx: 1 }).unwrap();
        assert_eq!(state.registers.gpr(GeneralRegister::R1), 0);

        state.react(&EmulatorEvent::SwitchMemory);
        assert_eq!(state.data_bank(), MemoryBank::Rom);
        run(&mut state, Instruction::Read { rx: 1 }).unwrap();
        assert_eq!(state.registers.gpr(GeneralRegister::R1), 0x70);
    }

    #[test]
    fn read_past_end_of_bank_is_fatal() {
        let mut state = CpuState::default();
        state.registers.set_address(0x0FFF);
        run(&mut state, Instruction::Read { rx: 0 }).unwrap();
        state.registers.set_address(0x1000);
        assert_eq!(
            run(&mut state, Instruction::Read { rx: 0 }),
            Err(Fault::AddressOutOfRange {
                bank: MemoryBank::Ram,
                address: 0x1000
            })
        );
    }

    #[test]
    fn jump_requires_even_target() {
        let mut state = CpuState::default();
        assert_eq!(
            run(&mut state, Instruction::Jump { address: 0x0ABC }).unwrap().pc_action,
            PcAction::SetPc(0x0ABC)
        );
        assert_eq!(
            run(&mut state, Instruction::Jump { address: 0x0003 }),
            Err(Fault::OddJumpAddress { address: 0x0003 })
        );
    }

    #[test]
    fn keyboard_byte_lands_in_register() {
        let mut state = CpuState::default();
        let mut keyboard = ScriptedKeyboard::new([0xAB]);
        execute_instruction(Instruction::ReadKeyboard { rx: 5 }, &mut state, &mut keyboard)
            .unwrap();
        assert_eq!(state.registers.gpr(GeneralRegister::R5), 0xAB);
    }

    #[test]
    fn event_instructions_defer_their_effect() {
        let mut state = CpuState::default();
        let before = state.clone();
        assert_eq!(
            run(&mut state, Instruction::SwitchMemory).unwrap().event,
            Some(EmulatorEvent::SwitchMemory)
        );
        assert_eq!(
            run(&mut state, Instruction::SetTimer { value: 5 }).unwrap().event,
            Some(EmulatorEvent::TimerSet(5))
        );
        assert_eq!(state, before);
    }

    #[test]
    fn skips_follow_register_comparison() {
        let mut state = CpuState::default();
        state.registers.set_gpr(GeneralRegister::R0, 4);
        state.registers.set_gpr(GeneralRegister::R1, 4);
        let equal = Instruction::SkipIfEqual { rx: 0, ry: 1 };
        let not_equal = Instruction::SkipIfNotEqual { rx: 0, ry: 1 };
        assert_eq!(run(&mut state, equal).unwrap().pc_action, PcAction::Increment(2));
        assert_eq!(run(&mut state, not_equal).unwrap().pc_action, PcAction::NoChange);

        state.registers.set_gpr(GeneralRegister::R1, 5);
        assert_eq!(run(&mut state, equal).unwrap().pc_action, PcAction::NoChange);
        assert_eq!(run(&mut state, not_equal).unwrap().pc_action, PcAction::Increment(2));
    }

    #[test]
    fn timer_register_reads_back() {
        let mut state = CpuState::default();
        state.registers.set_timer(17);
        run(&mut state, Instruction::ReadTimer { rx: 3 }).unwrap();
        assert_eq!(state.registers.gpr(GeneralRegister::R3), 17);
    }

    #[test]
    fn base10_writes_three_digits_at_a() {
        let mut state = CpuState::default();
        state.registers.set_gpr(GeneralRegister::R0, 254);
        run(&mut state, Instruction::SetAddress { address: 0x0100 }).unwrap();
        run(&mut state, Instruction::ConvertToBase10 { rx: 0 }).unwrap();
        assert_eq!(state.read_data(0x0100), Ok(2));
        assert_eq!(state.read_data(0x0101), Ok(5));
        assert_eq!(state.read_data(0x0102), Ok(4));
    }

    #[test]
    fn base10_at_end_of_ram_writes_nothing() {
        let mut state = CpuState::default();
        state.registers.set_gpr(GeneralRegister::R0, 123);
        state.registers.set_address(0x0FFE);
        let before = state.clone();
        assert_eq!(
            run(&mut state, Instruction::ConvertToBase10 { rx: 0 }),
            Err(Fault::AddressOutOfRange {
                bank: MemoryBank::Ram,
                address: 0x1000
            })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn ascii_conversion_rejects_values_above_f() {
        let mut state = CpuState::default();
        state.registers.set_gpr(GeneralRegister::R0, 0xB);
        run(&mut state, Instruction::ConvertToAscii { rx: 0, ry: 1 }).unwrap();
        assert_eq!(state.registers.gpr(GeneralRegister::R1), b'B');

        state.registers.set_gpr(GeneralRegister::R0, 0x10);
        assert_eq!(
            run(&mut state, Instruction::ConvertToAscii { rx: 0, ry: 1 }),
            Err(Fault::AsciiValueOutOfRange { value: 0x10 })
        );
        assert_eq!(state.registers.gpr(GeneralRegister::R1), b'B');
    }

    #[test]
    fn draw_validates_value_and_coordinates() {
        let mut state = CpuState::default();
        state.registers.set_gpr(GeneralRegister::R7, b'A');
        assert_eq!(
            run(&mut state, Instruction::Draw { rx: 7, ry: 2, rz: 3 }).unwrap(),
            ExecuteOutcome {
                pc_action: PcAction::NoChange,
                event: Some(EmulatorEvent::DrawPixel {
                    x: 2,
                    y: 3,
                    value: b'A'
                }),
            }
        );
        assert_eq!(
            run(&mut state, Instruction::Draw { rx: 7, ry: 8, rz: 9 }),
            Err(Fault::PixelOutOfRange { x: 8, y: 9 })
        );

        state.registers.set_gpr(GeneralRegister::R7, 128);
        assert_eq!(
            run(&mut state, Instruction::Draw { rx: 7, ry: 0, rz: 0 }),
            Err(Fault::DrawValueOutOfRange { value: 128 })
        );
    }
}
