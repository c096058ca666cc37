//! Fetch-decode-execute loop.

use crate::decoder::{Decoder, Instruction};
use crate::encoding::HALT_WORD;
use crate::event::{EmulatorEvent, EventBus};
use crate::execute::{execute_instruction, PcAction};
use crate::peripherals::KeyboardSource;
use crate::rom::RomError;
use crate::state::CpuState;
use crate::Fault;

/// Result of one instruction cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StepOutcome {
    /// An instruction retired.
    Executed {
        /// Address the instruction was fetched from.
        pc: u16,
        /// The instruction.
        instruction: Instruction,
        /// Event it raised, if any.
        event: Option<EmulatorEvent>,
    },
    /// The HALT word was fetched; nothing further should execute.
    Halted {
        /// Address of the HALT word.
        pc: u16,
        /// Message carried by the published [`EmulatorEvent::Halt`].
        message: String,
    },
}

/// CPU context bound to the event bus it publishes on.
///
/// Subscribers run while the caller is inside [`Cpu::step`] or
/// [`Cpu::tick_timer`]; they must not reach back into the same `Cpu`.
#[derive(Debug, Default)]
pub struct Cpu {
    state: CpuState,
    bus: EventBus,
}

/// Diagnostic text of the halt event for the HALT word at `pc`.
#[must_use]
pub fn halt_message(pc: u16) -> String {
    format!("encountered HALT instruction at PC={pc:#06X}")
}

impl Cpu {
    /// Creates a reset CPU publishing on `bus`.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: CpuState::default(),
            bus,
        }
    }

    /// Architectural state.
    #[must_use]
    pub const fn state(&self) -> &CpuState {
        &self.state
    }

    /// Mutable architectural state.
    pub const fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }

    /// Resets the CPU and installs `program` in ROM.
    ///
    /// # Errors
    ///
    /// Returns the validation failure; the CPU is untouched in that case.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), RomError> {
        self.state.load_program(program)
    }

    /// Decodes the instruction at the program counter without executing it.
    ///
    /// `None` for the HALT word or a word that cannot be fetched.
    #[must_use]
    pub fn peek(&self) -> Option<Instruction> {
        let word = self.state.fetch().ok()?;
        if word == HALT_WORD {
            return None;
        }
        Decoder::decode(word).ok()
    }

    /// Runs one instruction cycle.
    ///
    /// On a fault the program counter is left at the faulting instruction and
    /// no other state has changed.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] raised by fetch, decode, execute or the PC update.
    pub fn step(&mut self, keyboard: &mut dyn KeyboardSource) -> Result<StepOutcome, Fault> {
        let pc = self.state.registers.pc();
        let word = self.state.fetch()?;
        self.state.registers.advance_pc(2);

        if word == HALT_WORD {
            let message = halt_message(pc);
            tracing::debug!(pc, "halt word fetched");
            self.bus.publish(&EmulatorEvent::Halt {
                message: message.clone(),
            });
            return Ok(StepOutcome::Halted { pc, message });
        }

        let (instruction, event) = match self.execute_word(word, keyboard) {
            Ok(done) => done,
            Err(fault) => {
                self.state.registers.rewind_pc(2);
                return Err(fault);
            }
        };
        tracing::trace!(pc, word, %instruction, "executed");

        if let Some(event) = &event {
            self.dispatch(event);
        }

        Ok(StepOutcome::Executed {
            pc,
            instruction,
            event,
        })
    }

    fn execute_word(
        &mut self,
        word: u16,
        keyboard: &mut dyn KeyboardSource,
    ) -> Result<(Instruction, Option<EmulatorEvent>), Fault> {
        let instruction = Decoder::decode(word)?;
        let outcome = execute_instruction(instruction, &mut self.state, keyboard)?;
        match outcome.pc_action {
            PcAction::NoChange => {}
            PcAction::Increment(bytes) => self.state.registers.advance_pc(bytes),
            PcAction::SetPc(address) => self.state.registers.set_pc(address)?,
        }
        Ok((instruction, outcome.event))
    }

    /// Performs one timer-clock decrement and publishes the resulting tick.
    ///
    /// Returns the new timer value, or `None` when the timer was already zero.
    pub fn tick_timer(&mut self) -> Option<u8> {
        let event = self.state.decrement_timer()?;
        self.bus.publish(&event);
        match event {
            EmulatorEvent::TimerTick(value) => Some(value),
            _ => None,
        }
    }

    /// The CPU sees its own events first, then the bus, then any follow-up.
    fn dispatch(&mut self, event: &EmulatorEvent) {
        let follow_up = self.state.react(event);
        self.bus.publish(event);
        if let Some(follow_up) = follow_up {
            self.bus.publish(&follow_up);
        }
        if matches!(event, EmulatorEvent::DrawPixel { .. }) {
            self.bus.publish(&EmulatorEvent::Refresh);
        }
    }
}
